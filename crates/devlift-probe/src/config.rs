//! Probe timing and threshold configuration.

use std::time::Duration;

use crate::error::{ProbeError, Result};

/// Immutable thresholds and timing parameters shared by all probe kinds.
///
/// Constructed through [`ProbeConfig::builder`], which rejects out-of-range
/// values; the defaults (success threshold 1, failure threshold 3, timeout
/// 1 s, period 10 s, no initial delay) are always valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    success_threshold: u32,
    failure_threshold: u32,
    timeout: Duration,
    period: Duration,
    initial_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            success_threshold: 1,
            failure_threshold: 3,
            timeout: Duration::from_secs(1),
            period: Duration::from_secs(10),
            initial_delay: Duration::ZERO,
        }
    }
}

impl ProbeConfig {
    /// Starts building a config from the defaults.
    pub fn builder() -> ProbeConfigBuilder {
        ProbeConfigBuilder::default()
    }

    /// Consecutive successes required before `PASSED` is emitted.
    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }

    /// Consecutive failures required before `FAILED` is emitted.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Maximum time a single check may run before it is cancelled.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between the end of one check and the start of the next.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Delay before the first check only.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }
}

/// Validating builder for [`ProbeConfig`].
#[derive(Debug, Default)]
pub struct ProbeConfigBuilder {
    success_threshold: Option<u32>,
    failure_threshold: Option<u32>,
    timeout: Option<Duration>,
    period: Option<Duration>,
    initial_delay: Option<Duration>,
}

impl ProbeConfigBuilder {
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Builds the config, rejecting zero thresholds and zero durations
    /// where a positive minimum applies.
    pub fn build(self) -> Result<ProbeConfig> {
        let defaults = ProbeConfig::default();
        let config = ProbeConfig {
            success_threshold: self.success_threshold.unwrap_or(defaults.success_threshold),
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            period: self.period.unwrap_or(defaults.period),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
        };
        if config.success_threshold == 0 {
            return Err(ProbeError::InvalidConfig(
                "success_threshold must be at least 1".to_string(),
            ));
        }
        if config.failure_threshold == 0 {
            return Err(ProbeError::InvalidConfig(
                "failure_threshold must be at least 1".to_string(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(ProbeError::InvalidConfig(
                "timeout must be positive".to_string(),
            ));
        }
        if config.period.is_zero() {
            return Err(ProbeError::InvalidConfig(
                "period must be positive".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ProbeConfig::builder().build().unwrap();
        assert_eq!(config, ProbeConfig::default());
        assert_eq!(config.success_threshold(), 1);
        assert_eq!(config.failure_threshold(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.period(), Duration::from_secs(10));
        assert_eq!(config.initial_delay(), Duration::ZERO);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = ProbeConfig::builder()
            .success_threshold(2)
            .failure_threshold(5)
            .timeout(Duration::from_secs(3))
            .period(Duration::from_secs(30))
            .initial_delay(Duration::from_secs(7))
            .build()
            .unwrap();
        assert_eq!(config.success_threshold(), 2);
        assert_eq!(config.failure_threshold(), 5);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.period(), Duration::from_secs(30));
        assert_eq!(config.initial_delay(), Duration::from_secs(7));
    }

    #[test]
    fn zero_success_threshold_rejected() {
        let err = ProbeConfig::builder().success_threshold(0).build();
        assert!(matches!(err, Err(ProbeError::InvalidConfig(_))));
    }

    #[test]
    fn zero_failure_threshold_rejected() {
        let err = ProbeConfig::builder().failure_threshold(0).build();
        assert!(matches!(err, Err(ProbeError::InvalidConfig(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ProbeConfig::builder().timeout(Duration::ZERO).build();
        assert!(matches!(err, Err(ProbeError::InvalidConfig(_))));
    }

    #[test]
    fn zero_period_rejected() {
        let err = ProbeConfig::builder().period(Duration::ZERO).build();
        assert!(matches!(err, Err(ProbeError::InvalidConfig(_))));
    }

    #[test]
    fn zero_initial_delay_allowed() {
        let config = ProbeConfig::builder()
            .initial_delay(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(config.initial_delay(), Duration::ZERO);
    }
}
