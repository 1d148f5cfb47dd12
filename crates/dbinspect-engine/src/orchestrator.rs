//! Orchestrator that fans inspections out across servers.
//!
//! # Data Flow
//! ```text
//! ServerDescriptor list
//!     → one named thread per server (Dispatching)
//!     → connect + run checks, errors caught at the thread boundary
//!     → one TaskMessage per thread on a shared channel (AwaitingResults)
//!     → concatenate runs in dispatch order (Aggregating)
//!     → RunReport (Completed | PartiallyFailed)
//! ```
//!
//! A failing, panicking or hanging server never affects its siblings. The
//! channel is the only state shared between tasks.

use crate::runner::run_to_completion;
use chrono::Utc;
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use dbinspect_core::{
    Connector, InspectError, InspectionRun, NullProgressReporter, ProgressReporter, Result,
    RunReport, RunStamp, RunState, ServerDescriptor, ServerSummary, TaskStatus,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

/// Configuration for the orchestrator
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// One deadline shared by the whole run, measured from dispatch; not a
    /// per-task timer. `None` waits for every task however long it takes.
    pub run_deadline: Option<Duration>,
}

/// Message sent by a task exactly once
struct TaskMessage {
    index: usize,
    outcome: Result<InspectionRun>,
}

/// Dispatches one inspection task per server and aggregates the results
pub struct Orchestrator {
    connector: Arc<dyn Connector>,
    config: OrchestratorConfig,
    progress: Arc<dyn ProgressReporter>,
    state: RunState,
}

impl Orchestrator {
    /// Create an orchestrator over `connector`
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            config: OrchestratorConfig::default(),
            progress: Arc::new(NullProgressReporter),
            state: RunState::Idle,
        }
    }

    /// Set the orchestrator configuration
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the progress reporter
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Orchestrator state change");
        self.state = next;
    }

    /// Inspect every server and aggregate the records.
    ///
    /// Per-server failures are contained and reported in the returned
    /// [`RunReport`]; this never fails as a whole.
    pub fn run(&mut self, servers: &[ServerDescriptor]) -> RunReport {
        let started_at = Utc::now();
        let dispatched_at = Instant::now();
        let total = servers.len();

        info!("Starting inspection of {} servers", total);
        self.transition(RunState::Dispatching);
        self.progress.dispatch_started(total);

        let (tx, rx) = unbounded::<TaskMessage>();
        let mut outcomes: Vec<Option<Result<InspectionRun>>> = (0..total).map(|_| None).collect();
        let mut handles: Vec<Option<JoinHandle<()>>> = Vec::with_capacity(total);
        let mut pending = total;

        for (index, server) in servers.iter().enumerate() {
            match self.spawn_task(index, server, tx.clone()) {
                Ok(handle) => handles.push(Some(handle)),
                Err(e) => {
                    error!(server = %server.address(), error = %e, "Failed to spawn inspection thread");
                    self.progress.server_failed(server, &e);
                    outcomes[index] = Some(Err(e));
                    handles.push(None);
                    pending -= 1;
                }
            }
        }
        // Only task senders remain, so a disconnect means every task is gone.
        drop(tx);

        self.transition(RunState::AwaitingResults);
        let deadline = self.config.run_deadline.map(|t| dispatched_at + t);
        let mut timed_out = false;

        while pending > 0 {
            let message = match deadline {
                Some(deadline) => match rx.recv_deadline(deadline) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        timed_out = true;
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            outcomes[message.index] = Some(message.outcome);
            pending -= 1;
        }

        // Reap finished threads; unfinished ones are left detached.
        for (index, handle) in handles.into_iter().enumerate() {
            if let Some(handle) = handle {
                if outcomes[index].is_some() && handle.join().is_err() {
                    warn!(server = %servers[index].address(), "Inspection thread panicked after reporting");
                }
            }
        }

        self.transition(RunState::Aggregating);
        let mut records = Vec::new();
        let mut summaries = Vec::with_capacity(total);

        for (server, outcome) in servers.iter().zip(outcomes) {
            let status = match outcome {
                Some(Ok(run)) => {
                    let count = run.len();
                    records.extend(run.into_records());
                    TaskStatus::Inspected { records: count }
                }
                Some(Err(e)) => TaskStatus::Failed {
                    phase: e.phase().to_string(),
                    error: e.to_string(),
                },
                None if timed_out => {
                    error!(
                        server = %server.address(),
                        backend = %server.backend_kind,
                        phase = "deadline",
                        "Inspection did not finish before the deadline"
                    );
                    TaskStatus::TimedOut
                }
                None => {
                    error!(
                        server = %server.address(),
                        backend = %server.backend_kind,
                        phase = "task",
                        "Inspection task ended without reporting"
                    );
                    TaskStatus::Failed {
                        phase: "task".to_string(),
                        error: "task ended without reporting".to_string(),
                    }
                }
            };
            summaries.push(ServerSummary::new(server, status));
        }

        let state = if summaries.iter().all(|s| s.succeeded()) {
            RunState::Completed
        } else {
            RunState::PartiallyFailed
        };
        self.transition(state);
        self.progress.run_completed(records.len());

        info!(
            "Inspection {}: {} records from {}/{} servers",
            state,
            records.len(),
            summaries.iter().filter(|s| s.succeeded()).count(),
            total
        );

        RunReport {
            started_at,
            completed_at: Utc::now(),
            state,
            servers: summaries,
            records,
        }
    }

    fn spawn_task(
        &self,
        index: usize,
        server: &ServerDescriptor,
        tx: Sender<TaskMessage>,
    ) -> Result<JoinHandle<()>> {
        let connector = Arc::clone(&self.connector);
        let progress = Arc::clone(&self.progress);
        let server = server.clone();

        let handle = thread::Builder::new()
            .name(format!("inspect-{}", server.address()))
            .spawn(move || {
                let outcome = inspect_server(connector.as_ref(), progress.as_ref(), &server);
                // The receiver is gone only if the run already hit its deadline.
                let _ = tx.send(TaskMessage { index, outcome });
            })?;

        Ok(handle)
    }
}

/// Task boundary: inspect one server, containing every error and panic.
fn inspect_server(
    connector: &dyn Connector,
    progress: &dyn ProgressReporter,
    server: &ServerDescriptor,
) -> Result<InspectionRun> {
    let span = info_span!("inspect", server = %server.address(), backend = %server.backend_kind);
    let _enter = span.enter();

    progress.server_started(server);
    let stamp = RunStamp::capture(&server.ip);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let inspector = connector.connect(server)?;
        run_to_completion(inspector, &stamp)
    }))
    .unwrap_or_else(|payload| Err(InspectError::TaskPanicked(panic_message(payload.as_ref()))));

    match &result {
        Ok(run) => {
            info!(records = run.len(), "Inspection completed");
            progress.server_completed(server, run.len());
        }
        Err(e) => {
            error!(
                server = %server.address(),
                backend = %server.backend_kind,
                phase = e.phase(),
                error = %e,
                "Inspection failed"
            );
            progress.server_failed(server, e);
        }
    }

    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbinspect_core::{BackendKind, CheckStatus, Inspector};
    use dbinspect_inspectors::{KeyValueInspector, KeyValueSession};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory key-value session with a fixed query latency
    struct FakeRedis {
        password: Option<String>,
        latency: Duration,
        fail_acl: bool,
        closed: Arc<AtomicUsize>,
    }

    impl KeyValueSession for FakeRedis {
        fn config_get(&self, _parameter: &str) -> Result<Option<String>> {
            thread::sleep(self.latency);
            Ok(self.password.clone())
        }

        fn acl_list(&self) -> Result<Vec<String>> {
            if self.fail_acl {
                return Err(InspectError::check("RDB-02", "NOPERM"));
            }
            Ok(vec!["user default on ~* +@all".to_string()])
        }
    }

    impl Drop for FakeRedis {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Behaviour keyed by server ip
    #[derive(Default)]
    struct FakeConnector {
        latency: Duration,
        refuse: HashSet<String>,
        panic_on: HashSet<String>,
        fail_check: HashSet<String>,
        hang: HashSet<String>,
        closed: Arc<AtomicUsize>,
        connects: AtomicUsize,
    }

    impl Connector for FakeConnector {
        fn connect(&self, server: &ServerDescriptor) -> Result<Box<dyn Inspector>> {
            self.connects.fetch_add(1, Ordering::SeqCst);

            if self.refuse.contains(&server.ip) {
                return Err(InspectError::connection(server.address(), "connection refused"));
            }
            if self.panic_on.contains(&server.ip) {
                panic!("driver exploded");
            }
            if self.hang.contains(&server.ip) {
                thread::sleep(Duration::from_secs(5));
            }
            if server.backend_kind == BackendKind::InfluxDb {
                return Err(InspectError::NotImplemented(BackendKind::InfluxDb));
            }

            let session = FakeRedis {
                password: Some(server.password.clone()).filter(|p| !p.is_empty()),
                latency: self.latency,
                fail_acl: self.fail_check.contains(&server.ip),
                closed: Arc::clone(&self.closed),
            };
            Ok(Box::new(KeyValueInspector::new(server.address(), session)))
        }
    }

    fn redis(ip: &str, password: &str) -> ServerDescriptor {
        ServerDescriptor::new(ip, 6379, BackendKind::Redis).with_credentials("default", password)
    }

    #[test]
    fn test_every_healthy_server_yields_two_records() {
        let connector = Arc::new(FakeConnector::default());
        let servers = vec![redis("10.0.0.1", "s3cret"), redis("10.0.0.2", "")];

        let report = Orchestrator::new(connector.clone()).run(&servers);

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.total_records(), 4);
        for server in &servers {
            let ids: HashSet<_> = report.records_for(&server.ip).map(|r| r.check_id.clone()).collect();
            assert_eq!(ids.len(), 2);
        }
        let first: Vec<_> = report.records_for("10.0.0.1").collect();
        assert_eq!(first[0].check_id, "RDB-01");
        assert_eq!(first[0].status, CheckStatus::Pass);
        assert_eq!(report.records_for("10.0.0.2").next().unwrap().status, CheckStatus::Fail);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_are_contained_per_server() {
        let mut connector = FakeConnector::default();
        connector.refuse.insert("10.0.0.2".into());
        connector.fail_check.insert("10.0.0.3".into());
        connector.panic_on.insert("10.0.0.4".into());
        let connector = Arc::new(connector);

        let servers = vec![
            redis("10.0.0.1", "s3cret"),
            redis("10.0.0.2", "s3cret"),
            redis("10.0.0.3", "s3cret"),
            redis("10.0.0.4", "s3cret"),
            ServerDescriptor::new("10.0.0.5", 8086, BackendKind::InfluxDb),
        ];

        let report = Orchestrator::new(connector.clone()).run(&servers);

        assert_eq!(report.state, RunState::PartiallyFailed);
        assert_eq!(report.total_records(), 2);
        assert!(report.records.iter().all(|r| r.server_ip == "10.0.0.1"));
        assert_eq!(report.failed_servers().count(), 4);

        let phase = |i: usize| match &report.servers[i].status {
            TaskStatus::Failed { phase, .. } => phase.clone(),
            other => panic!("unexpected status {:?}", other),
        };
        assert_eq!(phase(1), "connect");
        assert_eq!(phase(2), "check");
        assert_eq!(phase(3), "task");
        assert_eq!(phase(4), "connect");

        // The server whose check failed was still closed.
        assert_eq!(connector.closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_servers_are_inspected_concurrently() {
        let latency = Duration::from_millis(300);
        let connector = Arc::new(FakeConnector {
            latency,
            ..Default::default()
        });
        let servers: Vec<_> = (1..=8).map(|i| redis(&format!("10.0.1.{}", i), "pw")).collect();

        let started = Instant::now();
        let report = Orchestrator::new(connector).run(&servers);
        let elapsed = started.elapsed();

        assert_eq!(report.total_records(), 16);
        assert!(
            elapsed < latency * 4,
            "8 servers took {:?}, expected close to one latency of {:?}",
            elapsed,
            latency
        );
    }

    #[test]
    fn test_deadline_marks_hung_servers() {
        let mut connector = FakeConnector::default();
        connector.hang.insert("10.0.0.2".into());
        let connector = Arc::new(connector);

        let servers = vec![redis("10.0.0.1", "s3cret"), redis("10.0.0.2", "s3cret")];
        let mut orchestrator = Orchestrator::new(connector).with_config(OrchestratorConfig {
            run_deadline: Some(Duration::from_millis(500)),
        });

        let started = Instant::now();
        let report = orchestrator.run(&servers);

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(report.state, RunState::PartiallyFailed);
        assert_eq!(report.servers[1].status, TaskStatus::TimedOut);
        assert_eq!(report.total_records(), 2);
        assert_eq!(orchestrator.state(), RunState::PartiallyFailed);
    }

    #[test]
    fn test_run_deadline_bounds_the_whole_run() {
        let connector = Arc::new(FakeConnector {
            latency: Duration::from_secs(1),
            ..Default::default()
        });
        let servers: Vec<_> = (1..=4).map(|i| redis(&format!("10.0.2.{}", i), "pw")).collect();
        let mut orchestrator = Orchestrator::new(connector).with_config(OrchestratorConfig {
            run_deadline: Some(Duration::from_millis(200)),
        });

        let started = Instant::now();
        let report = orchestrator.run(&servers);

        assert!(started.elapsed() < Duration::from_millis(900));
        assert!(report.servers.iter().all(|s| s.status == TaskStatus::TimedOut));
        assert_eq!(report.total_records(), 0);
    }

    #[test]
    fn test_empty_server_list_completes() {
        let mut orchestrator = Orchestrator::new(Arc::new(FakeConnector::default()));
        assert_eq!(orchestrator.state(), RunState::Idle);
        let report = orchestrator.run(&[]);
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.total_records(), 0);
    }

    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for Recorder {
        fn dispatch_started(&self, servers: usize) {
            self.events.lock().unwrap().push(format!("dispatch {}", servers));
        }
        fn server_started(&self, _server: &ServerDescriptor) {}
        fn server_completed(&self, server: &ServerDescriptor, records: usize) {
            self.events.lock().unwrap().push(format!("ok {} {}", server.ip, records));
        }
        fn server_failed(&self, server: &ServerDescriptor, _error: &InspectError) {
            self.events.lock().unwrap().push(format!("failed {}", server.ip));
        }
        fn run_completed(&self, total_records: usize) {
            self.events.lock().unwrap().push(format!("done {}", total_records));
        }
    }

    #[test]
    fn test_progress_reporter_is_notified() {
        let mut connector = FakeConnector::default();
        connector.refuse.insert("10.0.0.2".into());
        let recorder = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });

        Orchestrator::new(Arc::new(connector))
            .with_progress(recorder.clone())
            .run(&[redis("10.0.0.1", "pw"), redis("10.0.0.2", "pw")]);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.first().unwrap(), "dispatch 2");
        assert_eq!(events.last().unwrap(), "done 2");
        assert!(events.contains(&"ok 10.0.0.1 2".to_string()));
        assert!(events.contains(&"failed 10.0.0.2".to_string()));
    }
}
