use scout_logging::scout_warn;
use serde_json::{json, Value};

use crate::{ProgressSnapshot, Status, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start accepted; the engine must spawn the body for this task.
    Launch { task_id: TaskId },
    /// Stop accepted; the engine must raise this task's cancellation signal.
    Cancel { task_id: TaskId },
    /// Request refused before any state was touched.
    Rejected(Status),
    /// Push a notification to the shell.
    Notify(ShellEvent),
    /// A single callback payload was dropped.
    Discarded { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Item,
    Progress,
    Status,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Item => "item",
            Channel::Progress => "progress",
            Channel::Status => "status",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    Item(Value),
    Progress(ProgressSnapshot),
    Status { status: TaskStatus, terminal: bool },
}

impl ShellEvent {
    pub fn channel(&self) -> Channel {
        match self {
            ShellEvent::Item(_) => Channel::Item,
            ShellEvent::Progress(_) => Channel::Progress,
            ShellEvent::Status { .. } => Channel::Status,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            ShellEvent::Item(item) => item.clone(),
            ShellEvent::Progress(snapshot) => match serde_json::to_value(snapshot) {
                Ok(value) => value,
                Err(err) => {
                    scout_warn!("Progress snapshot not serializable, sending null: {}", err);
                    Value::Null
                }
            },
            ShellEvent::Status { status, terminal } => json!({
                "status": status.as_str(),
                "terminal": terminal,
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShellEvent::Status { terminal: true, .. })
    }
}
