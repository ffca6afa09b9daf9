use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use scout_core::{
    Msg, RawScrapeParams, Reply, ResultsPage, StateSnapshot, Status, StoreState,
    DEFAULT_RESULTS_LIMIT,
};
use scout_logging::{scout_debug, scout_info, scout_warn};
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::{
    fingerprint, system_info, BridgeConfig, ClientConfigFile, CredentialStore, EventChannel,
    LicenseError, LicenseService, LicenseSessionManager, ReqwestLicenseService, ScrapeEngine,
    ServiceResponse, SharedStateStore, Shell, SystemInfo, TaskController,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    License(#[from] LicenseError),
}

/// The single control surface the shell talks to.
///
/// All methods are synchronous. At most one of them blocks on the network
/// (`activate`, `validate`, `end_session`, or the license check inside
/// `start_scrape`); everything long-running is detached onto the internal
/// runtime. Must not be called from inside another tokio runtime.
pub struct Orchestrator {
    config: BridgeConfig,
    store: Arc<SharedStateStore>,
    sessions: LicenseSessionManager,
    tasks: TaskController,
    client_config: ClientConfigFile,
    shell: Arc<dyn Shell>,
    // Declared last so it is dropped after everything holding its handle.
    runtime: Runtime,
}

impl Orchestrator {
    pub fn new(
        config: BridgeConfig,
        shell: Arc<dyn Shell>,
        engine: Arc<dyn ScrapeEngine>,
    ) -> Result<Self, OrchestratorError> {
        let service = Arc::new(ReqwestLicenseService::new(config.license.clone())?);
        Self::with_service(config, service, shell, engine)
    }

    pub fn with_service(
        config: BridgeConfig,
        service: Arc<dyn LicenseService>,
        shell: Arc<dyn Shell>,
        engine: Arc<dyn ScrapeEngine>,
    ) -> Result<Self, OrchestratorError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("scout-worker")
            .build()?;

        let store = Arc::new(SharedStateStore::new(StoreState::new(
            config.features,
            config.result_capacity,
            &config.defaults,
        )));

        let client_config = ClientConfigFile::new(config.client_config_path());
        if let Some(dir) = client_config.load_export_dir() {
            if dir.is_dir() {
                scout_info!("Restored export directory {:?}", dir);
                store.apply(Msg::ExportDirChanged(dir));
            } else {
                scout_warn!("Ignoring remembered export directory {:?}: not found", dir);
            }
        }

        let sessions = LicenseSessionManager::new(
            service,
            CredentialStore::new(config.credential_path()),
            fingerprint::machine_hash(&config.fingerprint_salt),
            config.heartbeat.clone(),
            store.clone(),
        );
        let tasks = TaskController::new(
            store.clone(),
            EventChannel::new(shell.clone()),
            engine,
            runtime.handle().clone(),
        );

        Ok(Self {
            config,
            store,
            sessions,
            tasks,
            client_config,
            shell,
            runtime,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn machine_hash(&self) -> &str {
        self.sessions.machine_hash()
    }

    pub fn system_info(&self) -> SystemInfo {
        system_info()
    }

    pub fn pick_directory(&self) -> Reply {
        match self.shell.pick_directory() {
            Ok(Some(dir)) => {
                self.store.apply(Msg::ExportDirChanged(dir.clone()));
                if let Err(err) = self.client_config.save_export_dir(&dir) {
                    scout_warn!("Could not remember export directory {:?}: {}", dir, err);
                }
                Reply::ok().with_path(dir.display().to_string())
            }
            Ok(None) => Reply::new(Status::Cancelled),
            Err(err) => Reply::error(err.to_string()),
        }
    }

    pub fn activate(&self, key: &str) -> ServiceResponse {
        self.runtime.block_on(self.sessions.activate(key))
    }

    pub fn validate(&self) -> ServiceResponse {
        self.runtime.block_on(self.sessions.validate())
    }

    pub fn end_session(&self) -> ServiceResponse {
        self.runtime.block_on(self.sessions.end_session())
    }

    pub fn has_session(&self) -> bool {
        self.runtime.block_on(self.sessions.has_session())
    }

    /// Validates the request, re-checks the license and launches a run.
    pub fn start_scrape(&self, raw: &RawScrapeParams) -> Reply {
        let remembered = self
            .store
            .read(|state| state.export_dir().map(Path::to_path_buf));
        let params = match raw.normalize(&self.config.defaults, remembered.as_deref()) {
            Ok(params) => params,
            Err(err) => return Reply::new(err.status()).with_message(err.to_string()),
        };
        // Cheap early exit; the authoritative check is inside `TaskController::start`.
        if self.tasks.is_running() {
            return Reply::new(Status::AlreadyRunning);
        }

        let license = self.runtime.block_on(self.sessions.check());
        if !license.is_ok() {
            return license.into();
        }

        let output_path = self.config.output.path_in(&params.export_dir, Local::now());
        match self.tasks.start(&params, output_path.clone()) {
            Ok(_) => Reply::ok().with_path(output_path.display().to_string()),
            Err(status) => Reply::new(status),
        }
    }

    pub fn stop_scrape(&self) -> Reply {
        match self.tasks.stop() {
            Ok(_) => Reply::ok(),
            Err(status) => Reply::new(status),
        }
    }

    pub fn get_state(&self) -> StateSnapshot {
        let mut snapshot = self.store.snapshot();
        snapshot.machine_hash = self.machine_hash().to_string();
        snapshot
    }

    pub fn get_results(&self, limit: Option<usize>) -> ResultsPage {
        self.store
            .results_page(limit.unwrap_or(DEFAULT_RESULTS_LIMIT))
    }

    pub fn clear_results(&self) -> Reply {
        self.tasks.clear_results();
        Reply::ok()
    }

    /// Reveals `path`, else the current output file's folder, else the
    /// export directory.
    pub fn open_folder(&self, path: Option<&Path>) -> Reply {
        let target: Option<PathBuf> = path.map(Path::to_path_buf).or_else(|| {
            self.store.read(|state| {
                state
                    .output_path()
                    .or(state.export_dir())
                    .map(Path::to_path_buf)
            })
        });
        let Some(target) = target else {
            return Reply::new(Status::NoPath);
        };
        let folder = if target.is_file() {
            target.parent().map(Path::to_path_buf).unwrap_or(target)
        } else {
            target
        };
        match self.shell.open_path(&folder) {
            Ok(()) => Reply::ok().with_path(folder.display().to_string()),
            Err(err) => Reply::error(err.to_string()),
        }
    }

    /// Reports the output file of the latest run.
    pub fn export_data(&self) -> Reply {
        let Some(outfile) = self
            .store
            .read(|state| state.output_path().map(Path::to_path_buf))
        else {
            return Reply::new(Status::NoFile);
        };
        match std::fs::metadata(&outfile) {
            Ok(meta) if meta.is_file() => Reply::ok()
                .with_path(outfile.display().to_string())
                .with_file_size(meta.len()),
            Ok(_) => Reply::new(Status::NoFile),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Reply::new(Status::NoFile),
            Err(err) => Reply::error(err.to_string()),
        }
    }

    /// Stops the run, ends the session and tears the shell down.
    pub fn exit_app(&self) -> Reply {
        match self.tasks.stop() {
            Ok(task_id) => scout_info!("Exit requested stop of task {}", task_id),
            Err(status) => scout_debug!("No task to stop on exit: {}", status),
        }
        self.runtime.block_on(async {
            if self.sessions.has_session().await {
                let response = self.sessions.end_session().await;
                if !response.is_ok() {
                    scout_warn!("Session end on exit answered {}", response.status);
                    self.sessions.shutdown().await;
                }
            }
        });
        match self.shell.destroy() {
            Ok(()) => Reply::ok(),
            Err(err) => Reply::error(err.to_string()),
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Blocking workers outlive the runtime unless the engine is told to stop.
        self.tasks.cancel_running();
    }
}
