//! Probe factories and per-workspace probe sets.

use std::fmt;
use std::sync::Arc;

use devlift_core::ServerIdentity;

use crate::checker::{Checker, HttpChecker, TcpChecker};
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::probe::Probe;
use crate::target::HttpTarget;

type CheckerSource = Arc<dyn Fn() -> anyhow::Result<Box<dyn Checker>> + Send + Sync>;

/// Manufactures fresh, single-use [`Probe`]s for one monitored server.
///
/// A factory binds a [`ProbeConfig`] and check-specific parameters to a
/// server identity. It is stateless beyond its fields: [`get`](Self::get)
/// may be called concurrently and unboundedly, each call yielding an
/// independent probe. The check transport is chosen at construction time.
pub struct ProbeFactory {
    identity: ServerIdentity,
    config: ProbeConfig,
    source: CheckerSource,
}

impl ProbeFactory {
    /// Factory for the reference HTTP GET check.
    ///
    /// The HTTP client is built here so TLS or configuration defects
    /// surface at construction time rather than inside a scheduled check.
    pub fn http(identity: ServerIdentity, config: ProbeConfig, target: HttpTarget) -> Result<Self> {
        let client = HttpChecker::build_client(config.timeout())?;
        let source: CheckerSource =
            Arc::new(move || Ok(Box::new(HttpChecker::new(client.clone(), target.clone()))));
        Ok(Self {
            identity,
            config,
            source,
        })
    }

    /// Factory for a plain TCP connect check.
    pub fn tcp(
        identity: ServerIdentity,
        config: ProbeConfig,
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self> {
        if port == 0 {
            return Err(ProbeError::InvalidTarget(
                "port must be non-zero".to_string(),
            ));
        }
        let host = host.into();
        let source: CheckerSource =
            Arc::new(move || Ok(Box::new(TcpChecker::new(host.clone(), port))));
        Ok(Self {
            identity,
            config,
            source,
        })
    }

    /// Factory with a caller-supplied checker source, for embedders that
    /// bring their own transport.
    pub fn custom(
        identity: ServerIdentity,
        config: ProbeConfig,
        source: impl Fn() -> anyhow::Result<Box<dyn Checker>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            identity,
            config,
            source: Arc::new(source),
        }
    }

    /// A fresh, unused probe.
    ///
    /// An error here is a scheduler-fault (a defective checker source),
    /// never a check outcome.
    pub fn get(&self) -> Result<Probe> {
        let checker = (self.source)().map_err(ProbeError::Factory)?;
        Ok(Probe::new(checker))
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

impl fmt::Debug for ProbeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeFactory")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish()
    }
}

/// The probe factories belonging to one workspace runtime snapshot.
///
/// Built once by the caller, immutable, never mutated by the scheduler.
pub struct WorkspaceProbes {
    workspace_id: String,
    factories: Vec<ProbeFactory>,
}

impl WorkspaceProbes {
    pub fn new(workspace_id: impl Into<String>, factories: Vec<ProbeFactory>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            factories,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn factories(&self) -> &[ProbeFactory] {
        &self.factories
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ProbeFactory>) {
        (self.workspace_id, self.factories)
    }
}

impl fmt::Debug for WorkspaceProbes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceProbes")
            .field("workspace_id", &self.workspace_id)
            .field("factories", &self.factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ServerIdentity {
        ServerIdentity::new("ws-1", "dev-machine", "web-agent")
    }

    #[test]
    fn http_factory_exposes_identity_and_config() {
        let target = HttpTarget::new("http", "127.0.0.1", 8080, "/liveness").unwrap();
        let factory = ProbeFactory::http(identity(), ProbeConfig::default(), target).unwrap();
        assert_eq!(factory.identity().server_name, "web-agent");
        assert_eq!(factory.config().failure_threshold(), 3);
    }

    #[test]
    fn tcp_factory_rejects_zero_port() {
        let err = ProbeFactory::tcp(identity(), ProbeConfig::default(), "127.0.0.1", 0);
        assert!(matches!(err, Err(ProbeError::InvalidTarget(_))));
    }

    #[tokio::test]
    async fn get_yields_independent_probes() {
        struct OkChecker;

        #[async_trait::async_trait]
        impl Checker for OkChecker {
            async fn check(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let factory =
            ProbeFactory::custom(identity(), ProbeConfig::default(), || Ok(Box::new(OkChecker)));
        // Each probe is single-use; a fresh one per call must run cleanly.
        assert!(factory.get().unwrap().run().await);
        assert!(factory.get().unwrap().run().await);
    }

    #[test]
    fn defective_source_is_a_factory_error() {
        let factory = ProbeFactory::custom(identity(), ProbeConfig::default(), || {
            anyhow::bail!("no checker for you")
        });
        assert!(matches!(factory.get(), Err(ProbeError::Factory(_))));
    }

    #[test]
    fn workspace_probes_holds_order() {
        let f1 = ProbeFactory::tcp(identity(), ProbeConfig::default(), "127.0.0.1", 4444).unwrap();
        let f2 = ProbeFactory::tcp(
            ServerIdentity::new("ws-1", "dev-machine", "terminal"),
            ProbeConfig::default(),
            "127.0.0.1",
            4445,
        )
        .unwrap();
        let probes = WorkspaceProbes::new("ws-1", vec![f1, f2]);
        assert_eq!(probes.workspace_id(), "ws-1");
        assert_eq!(probes.factories()[0].identity().server_name, "web-agent");
        assert_eq!(probes.factories()[1].identity().server_name, "terminal");
    }
}
