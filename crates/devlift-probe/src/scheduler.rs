//! The probe scheduler.
//!
//! Runs each factory's probes on a recurring, fixed-delay cadence inside a
//! bounded pool, enforces per-check timeouts through a watchdog that
//! cancels the in-flight probe, folds raw check results through
//! [`ThresholdTracker`], and delivers debounced [`ProbeResult`]s to a
//! caller-supplied sink. Scheduling is workspace-scoped: all tasks for a
//! workspace can be cancelled in one sweep, and an alternate entry point
//! defers probing until the workspace reports `Running`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use devlift_core::{ServerIdentity, WorkspaceStatus};

use crate::error::{ProbeError, Result};
use crate::factory::{ProbeFactory, WorkspaceProbes};
use crate::result::ProbeResult;
use crate::tracker::ThresholdTracker;

/// Synchronous sink for probe results.
///
/// Invoked from a pool worker task; it must not block significantly.
pub type ResultSink = Arc<dyn Fn(ProbeResult) + Send + Sync>;

/// Supplies the current workspace status for deferred scheduling.
pub type StatusSupplier = Arc<dyn Fn() -> anyhow::Result<WorkspaceStatus> + Send + Sync>;

/// Default cadence of the deferred-start status poll.
const STATUS_POLL_PERIOD: Duration = Duration::from_secs(10);

/// One scheduled task: either a probe loop (with its server identity) or a
/// workspace status poll (no identity).
struct ScheduledTask {
    identity: Option<ServerIdentity>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Signals the loop to stop and aborts it, best-effort interrupting an
    /// in-flight check.
    fn stop(self) {
        let _ = self.stop_tx.send(true);
        self.handle.abort();
    }
}

/// Schedules liveness probes for workspace servers.
///
/// The per-workspace task registry is the only shared mutable structure;
/// it is a concurrent map so registration, cancellation, and shutdown
/// never hold a lock for the duration of a probe run.
pub struct ProbeScheduler {
    tasks: DashMap<String, Vec<ScheduledTask>>,
    /// Bounds the number of concurrently executing checks.
    pool: Arc<Semaphore>,
    shutting_down: AtomicBool,
    poll_period: Duration,
}

impl ProbeScheduler {
    /// Creates a scheduler whose pool runs at most `pool_size` checks
    /// concurrently.
    pub fn new(pool_size: usize) -> Self {
        Self {
            tasks: DashMap::new(),
            pool: Arc::new(Semaphore::new(pool_size)),
            shutting_down: AtomicBool::new(false),
            poll_period: STATUS_POLL_PERIOD,
        }
    }

    /// Overrides the deferred-start status poll cadence.
    pub fn with_status_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Schedules recurring probes for every factory in `probes`.
    ///
    /// Each factory gets its own fixed-delay task: the next check starts
    /// `period` after the previous one finished, so slow checks cannot
    /// pile up behind each other. The initial delay offsets the first
    /// check only.
    ///
    /// Fails with [`ProbeError::ShutDown`] after shutdown has begun and
    /// with [`ProbeError::AlreadyScheduled`] if any factory's identity is
    /// already scheduled for this workspace or appears more than once in
    /// `probes`.
    pub fn schedule(&self, probes: WorkspaceProbes, sink: ResultSink) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(ProbeError::ShutDown);
        }
        let (workspace_id, factories) = probes.into_parts();

        // Holding the workspace entry makes registration atomic with
        // respect to a concurrent cancel sweep or shutdown drain.
        let mut entry = self.tasks.entry(workspace_id.clone()).or_default();
        if self.shutting_down.load(Ordering::Acquire) {
            let was_empty = entry.is_empty();
            drop(entry);
            if was_empty {
                self.tasks.remove_if(&workspace_id, |_, tasks| tasks.is_empty());
            }
            return Err(ProbeError::ShutDown);
        }
        // An identity may collide with an already-registered task or with
        // another factory in the same batch; both are the same usage fault.
        for (i, factory) in factories.iter().enumerate() {
            let in_registry = entry
                .iter()
                .any(|task| task.identity.as_ref() == Some(factory.identity()));
            let in_batch = factories[..i]
                .iter()
                .any(|earlier| earlier.identity() == factory.identity());
            if in_registry || in_batch {
                let identity = factory.identity().clone();
                let was_empty = entry.is_empty();
                drop(entry);
                if was_empty {
                    self.tasks.remove_if(&workspace_id, |_, tasks| tasks.is_empty());
                }
                return Err(ProbeError::AlreadyScheduled { identity });
            }
        }

        let count = factories.len();
        for factory in factories {
            let task = self.spawn_probe_task(factory, sink.clone());
            entry.push(task);
        }
        drop(entry);

        info!(workspace_id, probes = count, "workspace probes scheduled");
        Ok(())
    }

    /// Defers scheduling until the workspace reports `Running`.
    ///
    /// A polling task queries `status` on a fixed delay: supplier errors
    /// are transient and polling continues; `Starting` keeps polling;
    /// `Running` replaces the poll with real probe tasks; a terminal
    /// status cancels everything for the workspace.
    pub fn schedule_when_running(
        self: &Arc<Self>,
        probes: WorkspaceProbes,
        status: StatusSupplier,
        sink: ResultSink,
    ) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(ProbeError::ShutDown);
        }
        let workspace_id = probes.workspace_id().to_string();

        // Same discipline as `schedule`: re-check under the held entry so
        // a shutdown drain that raced the first check cannot miss the poll
        // task we are about to register.
        let mut entry = self.tasks.entry(workspace_id.clone()).or_default();
        if self.shutting_down.load(Ordering::Acquire) {
            let was_empty = entry.is_empty();
            drop(entry);
            if was_empty {
                self.tasks.remove_if(&workspace_id, |_, tasks| tasks.is_empty());
            }
            return Err(ProbeError::ShutDown);
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(status_poll_loop(scheduler, probes, status, sink, stop_rx));
        entry.push(ScheduledTask {
            identity: None,
            stop_tx,
            handle,
        });
        drop(entry);

        debug!(workspace_id, "deferred probe scheduling registered");
        Ok(())
    }

    /// Cancels all probing for `workspace_id`: probe tasks and any status
    /// poll, best-effort interrupting in-flight checks. No further
    /// [`ProbeResult`] for the workspace is delivered after this returns.
    pub fn cancel(&self, workspace_id: &str) {
        if let Some((_, tasks)) = self.tasks.remove(workspace_id) {
            let count = tasks.len();
            for task in tasks {
                task.stop();
            }
            info!(workspace_id, tasks = count, "workspace probes cancelled");
        }
    }

    /// Stops accepting new scheduling, signals all tasks, waits up to
    /// `grace` for them to drain, then aborts the stragglers. Never blocks
    /// indefinitely.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutting_down.store(true, Ordering::Release);
        // Closing the pool wakes tasks blocked on a permit.
        self.pool.close();

        let workspaces: Vec<String> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        let mut handles = Vec::new();
        for workspace_id in workspaces {
            if let Some((_, tasks)) = self.tasks.remove(&workspace_id) {
                for task in tasks {
                    let _ = task.stop_tx.send(true);
                    handles.push(task.handle);
                }
            }
        }

        let deadline = Instant::now() + grace;
        let mut aborted = 0usize;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            warn!(aborted, "probe tasks aborted at shutdown");
        } else {
            info!("probe scheduler drained");
        }
    }

    /// Whether any task (probe or status poll) is tracked for the
    /// workspace.
    pub fn is_scheduled(&self, workspace_id: &str) -> bool {
        self.tasks.contains_key(workspace_id)
    }

    /// Workspace IDs with tracked tasks.
    pub fn active_workspaces(&self) -> Vec<String> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }

    fn spawn_probe_task(&self, factory: ProbeFactory, sink: ResultSink) -> ScheduledTask {
        let (stop_tx, stop_rx) = watch::channel(false);
        let identity = factory.identity().clone();
        let pool = Arc::clone(&self.pool);
        let handle = tokio::spawn(probe_loop(factory, sink, pool, stop_rx));
        ScheduledTask {
            identity: Some(identity),
            stop_tx,
            handle,
        }
    }

    /// Drops the workspace's status poll record without touching probe
    /// tasks. Called by the poll task itself once the workspace is
    /// running.
    fn remove_status_poll(&self, workspace_id: &str) {
        if let Some(mut entry) = self.tasks.get_mut(workspace_id) {
            entry.retain(|task| task.identity.is_some());
        }
    }
}

/// The recurring check loop for a single factory.
async fn probe_loop(
    factory: ProbeFactory,
    sink: ResultSink,
    pool: Arc<Semaphore>,
    mut stop: watch::Receiver<bool>,
) {
    let config = factory.config().clone();
    let identity = factory.identity().clone();
    let mut tracker = ThresholdTracker::new(config.success_threshold(), config.failure_threshold());

    debug!(
        %identity,
        period = ?config.period(),
        timeout = ?config.timeout(),
        success_threshold = config.success_threshold(),
        failure_threshold = config.failure_threshold(),
        "probe loop starting"
    );

    if !config.initial_delay().is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(config.initial_delay()) => {}
            _ = stop.changed() => return,
        }
    }

    loop {
        if *stop.borrow() {
            break;
        }

        let probe = match factory.get() {
            Ok(probe) => probe,
            Err(error) => {
                // A failing factory is a configuration defect, not an
                // unreachable server; it is never folded into the
                // threshold stream.
                error!(%identity, %error, "probe factory failed, stopping probe task");
                break;
            }
        };

        let permit = tokio::select! {
            permit = Arc::clone(&pool).acquire_owned() => match permit {
                Ok(permit) => permit,
                // Pool closed: the scheduler is shutting down.
                Err(_) => break,
            },
            _ = stop.changed() => break,
        };

        // Watchdog: timeout is an externally triggered cancellation,
        // identical in effect to a caller-initiated one.
        let watchdog_cancel = probe.cancel_handle();
        let timeout = config.timeout();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog_cancel.cancel();
        });

        let interrupt = probe.cancel_handle();
        let passed = tokio::select! {
            passed = probe.run() => passed,
            _ = stop.changed() => {
                interrupt.cancel();
                false
            }
        };
        // Disarm before folding the result so the watchdog cannot fire
        // against a completed check.
        watchdog.abort();
        drop(permit);

        let crossed = tracker.record(passed);
        // A cancellation that raced the check must win: never deliver a
        // stale result for a workspace that is no longer monitored.
        if *stop.borrow() {
            break;
        }
        if let Some(status) = crossed {
            debug!(%identity, ?status, "threshold crossed");
            sink(ProbeResult::new(identity.clone(), status));
        }

        // Fixed delay: measured from the end of the previous check.
        tokio::select! {
            _ = tokio::time::sleep(config.period()) => {}
            _ = stop.changed() => break,
        }
    }

    debug!(%identity, "probe loop exited");
}

/// Polls the workspace status until probing can start or must be
/// abandoned.
async fn status_poll_loop(
    scheduler: Arc<ProbeScheduler>,
    probes: WorkspaceProbes,
    status: StatusSupplier,
    sink: ResultSink,
    mut stop: watch::Receiver<bool>,
) {
    let workspace_id = probes.workspace_id().to_string();
    let mut probes = Some(probes);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(scheduler.poll_period) => {}
            _ = stop.changed() => return,
        }
        if *stop.borrow() {
            return;
        }

        match status() {
            Err(error) => {
                // Transient: the supplier may race workspace bootstrap.
                warn!(workspace_id, %error, "workspace status unavailable, will retry");
            }
            Ok(WorkspaceStatus::Starting) => {
                debug!(workspace_id, "workspace still starting");
            }
            Ok(WorkspaceStatus::Running) => {
                let Some(probes) = probes.take() else { return };
                // Our own poll record stays registered through the handoff
                // (its identity is `None`, so the duplicate gate ignores
                // it); a cancel landing mid-registration can therefore
                // still signal this task's stop channel.
                let scheduled = scheduler.schedule(probes, sink);
                scheduler.remove_status_poll(&workspace_id);
                match scheduled {
                    Ok(()) => {
                        if *stop.borrow() {
                            // A cancel swept the workspace while we were
                            // registering; sweep our own registration too.
                            scheduler.cancel(&workspace_id);
                        } else {
                            info!(workspace_id, "workspace running, probes scheduled");
                        }
                    }
                    Err(error) => {
                        warn!(workspace_id, %error, "deferred probe scheduling failed");
                    }
                }
                return;
            }
            Ok(terminal) => {
                debug!(workspace_id, status = %terminal, "workspace reached terminal status before probing started");
                scheduler.cancel(&workspace_id);
                return;
            }
        }
    }
}
