#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use scout_engine::{Shell, ShellError};
use serde_json::Value;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

/// Shell double that records every pushed event and opened path.
#[derive(Default)]
pub struct RecordingShell {
    pub events: Mutex<Vec<(String, Value)>>,
    pub opened: Mutex<Vec<PathBuf>>,
    pub picked: Mutex<Option<PathBuf>>,
    pub destroyed: Mutex<bool>,
    pub fail_on: Mutex<Option<String>>,
    pub panic_on: Mutex<Option<String>>,
    pub slow_status: Mutex<Option<(String, Duration)>>,
}

impl RecordingShell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn picking(dir: &Path) -> Arc<Self> {
        let shell = Self::default();
        *shell.picked.lock().unwrap() = Some(dir.to_path_buf());
        Arc::new(shell)
    }

    /// Every push on `channel` returns an error.
    pub fn failing(channel: &str) -> Arc<Self> {
        let shell = Self::default();
        *shell.fail_on.lock().unwrap() = Some(channel.to_string());
        Arc::new(shell)
    }

    /// Every push on `channel` panics.
    pub fn panicking(channel: &str) -> Arc<Self> {
        let shell = Self::default();
        *shell.panic_on.lock().unwrap() = Some(channel.to_string());
        Arc::new(shell)
    }

    /// Delivery of the given status push takes `delay`.
    pub fn slow_on_status(status: &str, delay: Duration) -> Arc<Self> {
        let shell = Self::default();
        *shell.slow_status.lock().unwrap() = Some((status.to_string(), delay));
        Arc::new(shell)
    }

    pub fn statuses(&self) -> Vec<String> {
        self.on("status")
            .into_iter()
            .map(|payload| payload["status"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn on(&self, channel: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn terminal_statuses(&self) -> Vec<String> {
        self.on("status")
            .into_iter()
            .filter(|payload| payload["terminal"] == Value::Bool(true))
            .map(|payload| payload["status"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Shell for RecordingShell {
    fn pick_directory(&self) -> Result<Option<PathBuf>, ShellError> {
        Ok(self.picked.lock().unwrap().clone())
    }

    fn push_event(&self, channel: &str, payload: &Value) -> Result<(), ShellError> {
        let panic_on = self.panic_on.lock().unwrap().clone();
        if panic_on.as_deref() == Some(channel) {
            panic!("shell window vanished while pushing {channel}");
        }
        let fail_on = self.fail_on.lock().unwrap().clone();
        if fail_on.as_deref() == Some(channel) {
            return Err(ShellError::Delivery {
                channel: channel.to_string(),
                message: "window closed".to_string(),
            });
        }
        let slow = self.slow_status.lock().unwrap().clone();
        if let Some((status, delay)) = slow {
            if channel == "status" && payload["status"] == Value::String(status) {
                std::thread::sleep(delay);
            }
        }
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), payload.clone()));
        Ok(())
    }

    fn open_path(&self, path: &Path) -> Result<(), ShellError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn destroy(&self) -> Result<(), ShellError> {
        *self.destroyed.lock().unwrap() = true;
        Ok(())
    }
}

/// Polls `condition` until it holds or `limit` elapses.
pub fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
