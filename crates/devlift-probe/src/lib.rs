//! devlift-probe — server liveness probing for workspace runtimes.
//!
//! Periodically checks whether the servers inside a running workspace are
//! reachable and healthy, and converts raw check outcomes into debounced,
//! threshold-gated [`ProbeResult`] events for the rest of the platform.
//!
//! # Architecture
//!
//! ```text
//! ProbeScheduler
//!   ├── per-factory probe task (fixed-delay cadence, bounded pool)
//!   │   ├── ProbeFactory::get() → Probe (single use, cancellable)
//!   │   ├── watchdog → CancelHandle::cancel() after the timeout
//!   │   ├── ThresholdTracker (consecutive success/failure streaks)
//!   │   └── ProbeResult → sink, only on threshold crossings
//!   └── status poll task (deferred start until the workspace runs)
//! ```
//!
//! Check failures are data, never errors: a single failed check is
//! absorbed into the streak and an event is emitted only when a streak
//! crosses its configured threshold. Cancellation is workspace-scoped and
//! best-effort interrupts in-flight checks.

pub mod checker;
pub mod config;
pub mod error;
pub mod factory;
pub mod probe;
pub mod result;
pub mod scheduler;
pub mod target;
pub mod tracker;

pub use checker::Checker;
pub use config::{ProbeConfig, ProbeConfigBuilder};
pub use error::ProbeError;
pub use factory::{ProbeFactory, WorkspaceProbes};
pub use probe::{CancelHandle, Probe};
pub use result::{ProbeResult, ProbeStatus};
pub use scheduler::{ProbeScheduler, ResultSink, StatusSupplier};
pub use target::{HttpTarget, Scheme};
pub use tracker::ThresholdTracker;
