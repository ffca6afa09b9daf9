use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{LicenseId, ScrapeParams, TaskId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Shell asked for a new run with validated parameters.
    StartRequested {
        params: ScrapeParams,
        output_path: PathBuf,
        started_at: DateTime<Utc>,
    },
    /// Collaborator discovered one entity.
    ItemReceived { task_id: TaskId, item: Value },
    /// Collaborator reported its counters.
    ProgressReported {
        task_id: TaskId,
        info: Value,
        at: DateTime<Utc>,
    },
    /// Shell asked the running task to stop.
    StopRequested,
    /// The task body returned, failed or acknowledged cancellation.
    TaskFinished { task_id: TaskId, outcome: TaskOutcome },
    /// Shell asked to drop the buffered results.
    ResultsCleared,
    /// A new export directory was picked or restored.
    ExportDirChanged(PathBuf),
    /// Session manager gained or lost a live session.
    SessionChanged {
        license_id: Option<LicenseId>,
        active: bool,
    },
    /// A credential was stored or found missing.
    ActivationChanged {
        license_id: Option<LicenseId>,
        activated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Cancelled,
    Failed(String),
}
