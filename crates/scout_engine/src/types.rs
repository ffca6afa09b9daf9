use std::fmt;

use scout_core::{LicenseId, Reply, Status};
use serde::{Deserialize, Serialize};

/// Reply body shared by every license-service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<LicenseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceResponse {
    pub fn status(status: Status) -> Self {
        Self {
            status,
            license_id: None,
            session_token: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Caller-facing form of a transport failure.
    pub fn from_error(err: &LicenseError) -> Self {
        Self::status(Status::Error).with_message(err.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

impl From<ServiceResponse> for Reply {
    fn from(response: ServiceResponse) -> Self {
        Reply {
            status: response.status,
            message: response.message,
            path: None,
            file_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ActivateRequest<'a> {
    pub license_key: &'a str,
    pub machine_hash: &'a str,
    pub app_version: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ValidateRequest<'a> {
    pub license_key: &'a str,
    pub machine_hash: &'a str,
}

/// Identity of a live session, sent with heartbeat and end calls.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SessionCredentials {
    pub license_id: LicenseId,
    pub machine_hash: String,
    pub session_token: String,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("license_id", &self.license_id)
            .field("session_token", &scout_logging::redact(&self.session_token))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LicenseError {
    pub kind: FailureKind,
    pub message: String,
}

impl LicenseError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Encode,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Encode => write!(f, "unencodable request"),
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
