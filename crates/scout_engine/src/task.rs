use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use scout_core::{Effect, Msg, ScrapeParams, Status, TaskId, TaskOutcome};
use scout_logging::{scout_error, scout_info, scout_warn};
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::shell::panic_message;
use crate::{EventChannel, PersistError, SharedStateStore};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("scrape failed: {0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Inputs handed to the scrape engine for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeJob {
    pub keyword: String,
    pub price_threshold: f64,
    pub pinned_threshold: f64,
    pub reviews_threshold: u64,
    pub output_path: PathBuf,
}

impl ScrapeJob {
    pub fn new(params: &ScrapeParams, output_path: PathBuf) -> Self {
        Self {
            keyword: params.keyword.clone(),
            price_threshold: params.price_threshold,
            pinned_threshold: params.pinned_threshold,
            reviews_threshold: params.reviews_threshold,
            output_path,
        }
    }
}

/// Receives what the scrape engine discovers while it runs.
pub trait ScrapeSink: Send + Sync {
    /// One discovered entity; carries at least `price` and `pinned`.
    fn on_item(&self, item: Value);

    /// Counters: `visited`, `collected`, `filtered`, `list_count`, `batch_progress`.
    fn on_progress(&self, info: Value);
}

/// The data-collection collaborator.
///
/// `run` blocks for the whole run, writes its artifact to
/// `job.output_path`, and must return promptly once `cancel` fires.
pub trait ScrapeEngine: Send + Sync + 'static {
    fn run(
        &self,
        job: &ScrapeJob,
        sink: &dyn ScrapeSink,
        cancel: &CancellationToken,
    ) -> Result<(), ScrapeError>;
}

struct RunningTask {
    task_id: TaskId,
    cancel: CancellationToken,
}

/// Runs at most one scrape at a time and reports it into the shared store.
pub struct TaskController {
    store: Arc<SharedStateStore>,
    events: EventChannel,
    engine: Arc<dyn ScrapeEngine>,
    runtime: Handle,
    running: Arc<Mutex<Option<RunningTask>>>,
}

impl TaskController {
    pub fn new(
        store: Arc<SharedStateStore>,
        events: EventChannel,
        engine: Arc<dyn ScrapeEngine>,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            events,
            engine,
            runtime,
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Moves the task to `Running` and launches the body in the background.
    ///
    /// The running check and the transition happen under one lock, so of two
    /// concurrent starts exactly one wins; the other gets `ALREADY_RUNNING`.
    pub fn start(&self, params: &ScrapeParams, output_path: PathBuf) -> Result<TaskId, Status> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let effects = self.store.apply(Msg::StartRequested {
            params: params.clone(),
            output_path: output_path.clone(),
            started_at: Utc::now(),
        });
        let task_id = launched(&effects)?;
        let cancel = CancellationToken::new();
        *running = Some(RunningTask {
            task_id,
            cancel: cancel.clone(),
        });
        // Status pushes for a task are delivered under `running` so the
        // watcher's terminal push always comes last.
        self.events.dispatch(effects);
        drop(running);

        scout_info!(
            "Task {} started: keyword={:?} output={:?}",
            task_id,
            params.keyword,
            output_path
        );

        let job = ScrapeJob::new(params, output_path);
        let sink = TaskSink {
            task_id,
            store: self.store.clone(),
            events: self.events.clone(),
        };
        let engine = self.engine.clone();
        let store = self.store.clone();
        let events = self.events.clone();
        let running = self.running.clone();
        self.runtime.spawn(async move {
            let body_cancel = cancel.clone();
            let joined =
                tokio::task::spawn_blocking(move || engine.run(&job, &sink, &body_cancel)).await;
            let outcome = match joined {
                Ok(Ok(())) if cancel.is_cancelled() => TaskOutcome::Cancelled,
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(err)) => TaskOutcome::Failed(err.to_string()),
                Err(join_err) if join_err.is_panic() => {
                    TaskOutcome::Failed(panic_message(join_err.into_panic().as_ref()))
                }
                Err(join_err) => TaskOutcome::Failed(join_err.to_string()),
            };
            match &outcome {
                TaskOutcome::Failed(reason) => scout_error!("Task {} failed: {}", task_id, reason),
                other => scout_info!("Task {} finished: {:?}", task_id, other),
            }

            let mut slot = running.lock().unwrap_or_else(PoisonError::into_inner);
            let effects = store.apply(Msg::TaskFinished { task_id, outcome });
            if slot.as_ref().is_some_and(|r| r.task_id == task_id) {
                *slot = None;
            }
            events.dispatch(effects);
            drop(slot);
        });

        Ok(task_id)
    }

    /// Raises the cancellation signal of the running task.
    ///
    /// Returns once the signal is raised; the task reaches its terminal state
    /// when the engine notices.
    pub fn stop(&self) -> Result<TaskId, Status> {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let effects = self.store.apply(Msg::StopRequested);
        let mut stopped = Err(Status::NotRunning);
        for effect in &effects {
            match effect {
                Effect::Cancel { task_id } => {
                    if let Some(task) = running.as_ref().filter(|t| t.task_id == *task_id) {
                        task.cancel.cancel();
                    }
                    stopped = Ok(*task_id);
                }
                Effect::Rejected(status) => stopped = Err(status.clone()),
                _ => {}
            }
        }
        if let Ok(task_id) = stopped {
            scout_info!("Stop requested for task {}", task_id);
        }
        self.events.dispatch(effects);
        drop(running);
        stopped
    }

    /// Raises the cancellation signal without a state transition.
    pub fn cancel_running(&self) {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = running.as_ref() {
            task.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.store.read(|state| state.status().is_active())
    }

    pub fn clear_results(&self) {
        let effects = self.store.apply(Msg::ResultsCleared);
        self.events.dispatch(effects);
    }
}

fn launched(effects: &[Effect]) -> Result<TaskId, Status> {
    for effect in effects {
        match effect {
            Effect::Launch { task_id } => return Ok(*task_id),
            Effect::Rejected(status) => return Err(status.clone()),
            _ => {}
        }
    }
    Err(Status::Error)
}

/// Callback target handed to the engine; isolates each invocation.
struct TaskSink {
    task_id: TaskId,
    store: Arc<SharedStateStore>,
    events: EventChannel,
}

impl TaskSink {
    fn isolate(&self, what: &str, f: impl FnOnce()) {
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(f)) {
            scout_warn!(
                "Task {} {} callback failed: {}",
                self.task_id,
                what,
                panic_message(panic.as_ref())
            );
        }
    }
}

impl ScrapeSink for TaskSink {
    fn on_item(&self, item: Value) {
        self.isolate("item", || {
            let effects = self.store.apply(Msg::ItemReceived {
                task_id: self.task_id,
                item,
            });
            self.events.dispatch(effects);
        });
    }

    fn on_progress(&self, info: Value) {
        self.isolate("progress", || {
            let effects = self.store.apply(Msg::ProgressReported {
                task_id: self.task_id,
                info,
                at: Utc::now(),
            });
            self.events.dispatch(effects);
        });
    }
}
