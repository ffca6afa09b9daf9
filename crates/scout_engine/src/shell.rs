use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scout_core::{Effect, ShellEvent};
use scout_logging::{scout_trace, scout_warn};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("shell unavailable: {0}")]
    Unavailable(String),
    #[error("delivery on '{channel}' failed: {message}")]
    Delivery { channel: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The window or console hosting the control surface.
pub trait Shell: Send + Sync {
    /// Asks the user for a directory. `None` when the dialog was dismissed.
    fn pick_directory(&self) -> Result<Option<PathBuf>, ShellError>;

    /// Fire-and-forget notification on a named channel.
    fn push_event(&self, channel: &str, payload: &Value) -> Result<(), ShellError>;

    /// Reveals a file or directory to the user.
    fn open_path(&self, path: &Path) -> Result<(), ShellError>;

    fn destroy(&self) -> Result<(), ShellError>;
}

/// Best-effort delivery of reducer effects to the shell.
#[derive(Clone)]
pub struct EventChannel {
    shell: Arc<dyn Shell>,
}

impl EventChannel {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }

    pub fn deliver(&self, event: &ShellEvent) {
        let channel = event.channel().as_str();
        let pushed = panic::catch_unwind(AssertUnwindSafe(|| {
            self.shell.push_event(channel, &event.payload())
        }));
        match pushed {
            Ok(Ok(())) => scout_trace!("Pushed {} event", channel),
            Ok(Err(err)) => scout_warn!("Dropped {} event: {}", channel, err),
            Err(panic) => scout_warn!(
                "Dropped {} event: shell panicked: {}",
                channel,
                panic_message(panic.as_ref())
            ),
        }
    }

    /// Runs the notification and logging effects; control effects are
    /// handled by whoever applied the message.
    pub fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(event) => self.deliver(&event),
                Effect::Discarded { reason } => scout_warn!("Discarded callback: {}", reason),
                Effect::Launch { .. } | Effect::Cancel { .. } | Effect::Rejected(_) => {}
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
