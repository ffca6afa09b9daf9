//! Scout engine: license session, background task and the control surface.
mod client_config;
mod config;
mod credentials;
pub mod fingerprint;
mod heartbeat;
mod license;
mod orchestrator;
mod persist;
mod session;
mod shell;
mod store;
mod system;
mod task;
mod types;

pub use client_config::{ClientConfigFile, CLIENT_CONFIG_FILENAME};
pub use config::{BridgeConfig, OutputNaming};
pub use credentials::{CredentialStore, LicenseCredential, CREDENTIAL_FILENAME};
pub use heartbeat::{HeartbeatLoop, HeartbeatSettings};
pub use license::{LicenseService, LicenseSettings, ReqwestLicenseService};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use persist::{ensure_dir, AtomicFile, PersistError};
pub use session::LicenseSessionManager;
pub use shell::{EventChannel, Shell, ShellError};
pub use store::SharedStateStore;
pub use system::{system_info, SystemInfo};
pub use task::{ScrapeEngine, ScrapeError, ScrapeJob, ScrapeSink, TaskController};
pub use types::{FailureKind, LicenseError, ServiceResponse, SessionCredentials};
