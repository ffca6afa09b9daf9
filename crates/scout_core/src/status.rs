use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code carried by every caller-facing result.
///
/// Codes produced locally have dedicated variants; anything else reported by
/// the license service is kept verbatim in `Other` so it can be handed back to
/// the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Ok,
    NoKey,
    NoSession,
    NoExportDir,
    AlreadyRunning,
    NotRunning,
    Unsupported,
    ParamError,
    NoPath,
    NoFile,
    Cancelled,
    Error,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Ok => "OK",
            Status::NoKey => "NO_KEY",
            Status::NoSession => "NO_SESSION",
            Status::NoExportDir => "NO_EXPORT_DIR",
            Status::AlreadyRunning => "ALREADY_RUNNING",
            Status::NotRunning => "NOT_RUNNING",
            Status::Unsupported => "UNSUPPORTED",
            Status::ParamError => "PARAM_ERROR",
            Status::NoPath => "NO_PATH",
            Status::NoFile => "NO_FILE",
            Status::Cancelled => "CANCELLED",
            Status::Error => "ERROR",
            Status::Other(code) => code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl From<String> for Status {
    fn from(code: String) -> Self {
        match code.as_str() {
            "OK" => Status::Ok,
            "NO_KEY" => Status::NoKey,
            "NO_SESSION" => Status::NoSession,
            "NO_EXPORT_DIR" => Status::NoExportDir,
            "ALREADY_RUNNING" => Status::AlreadyRunning,
            "NOT_RUNNING" => Status::NotRunning,
            "UNSUPPORTED" => Status::Unsupported,
            "PARAM_ERROR" => Status::ParamError,
            "NO_PATH" => Status::NoPath,
            "NO_FILE" => Status::NoFile,
            "CANCELLED" => Status::Cancelled,
            "ERROR" => Status::Error,
            _ => Status::Other(code),
        }
    }
}

impl From<&str> for Status {
    fn from(code: &str) -> Self {
        Status::from(code.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result returned to the shell by the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl Reply {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            message: None,
            path: None,
            file_size: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(Status::Ok)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

impl From<Status> for Reply {
    fn from(status: Status) -> Self {
        Reply::new(status)
    }
}
