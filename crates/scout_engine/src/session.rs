use std::sync::Arc;

use scout_core::{LicenseId, Msg, Status};
use scout_logging::{redact, scout_info, scout_warn};
use tokio::sync::Mutex;

use crate::{
    CredentialStore, HeartbeatLoop, HeartbeatSettings, LicenseCredential, LicenseService,
    ServiceResponse, SessionCredentials, SharedStateStore,
};

#[derive(Default)]
struct SessionSlot {
    license_id: Option<LicenseId>,
    token: Option<String>,
    heartbeat: Option<HeartbeatLoop>,
}

impl SessionSlot {
    /// Drops the token and waits for the heartbeat loop to exit.
    async fn close(&mut self) {
        self.token = None;
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop().await;
        }
    }
}

/// Owns the license credential, the live session and its heartbeat loop.
pub struct LicenseSessionManager {
    service: Arc<dyn LicenseService>,
    credentials: CredentialStore,
    machine_hash: String,
    heartbeat: HeartbeatSettings,
    store: Arc<SharedStateStore>,
    slot: Mutex<SessionSlot>,
}

impl LicenseSessionManager {
    pub fn new(
        service: Arc<dyn LicenseService>,
        credentials: CredentialStore,
        machine_hash: String,
        heartbeat: HeartbeatSettings,
        store: Arc<SharedStateStore>,
    ) -> Self {
        let stored = credentials.load();
        store.apply(Msg::ActivationChanged {
            license_id: stored.as_ref().and_then(|c| c.license_id),
            activated: stored.is_some(),
        });
        Self {
            service,
            credentials,
            machine_hash,
            heartbeat,
            store,
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    pub fn machine_hash(&self) -> &str {
        &self.machine_hash
    }

    pub fn credential(&self) -> Option<LicenseCredential> {
        self.credentials.load()
    }

    /// Registers `key` for this machine and stores it on success.
    pub async fn activate(&self, key: &str) -> ServiceResponse {
        let key = key.trim();
        if key.is_empty() {
            return ServiceResponse::status(Status::NoKey).with_message("license key is empty");
        }
        let response = match self.service.activate(key, &self.machine_hash).await {
            Ok(response) => response,
            Err(err) => {
                scout_warn!("Activation of {} failed: {}", redact(key), err);
                return ServiceResponse::from_error(&err);
            }
        };
        if !response.is_ok() {
            scout_info!("Activation of {} refused: {}", redact(key), response.status);
            return response;
        }

        let credential = LicenseCredential {
            license_key: key.to_string(),
            license_id: response.license_id,
        };
        if let Err(err) = self.credentials.save(&credential) {
            scout_warn!("Activation succeeded but the credential was not stored: {}", err);
        }
        self.store.apply(Msg::ActivationChanged {
            license_id: response.license_id,
            activated: true,
        });
        response
    }

    /// Validates the stored key against the service without touching the
    /// live session.
    pub async fn check(&self) -> ServiceResponse {
        let Some(credential) = self.credentials.load() else {
            return ServiceResponse::status(Status::NoKey);
        };
        match self
            .service
            .validate(&credential.license_key, &self.machine_hash)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                scout_warn!("License check failed: {}", err);
                ServiceResponse::from_error(&err)
            }
        }
    }

    /// Validates the stored key and (re)starts the session heartbeat.
    pub async fn validate(&self) -> ServiceResponse {
        let Some(credential) = self.credentials.load() else {
            return ServiceResponse::status(Status::NoKey);
        };
        let response = match self
            .service
            .validate(&credential.license_key, &self.machine_hash)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                scout_warn!("Validation failed: {}", err);
                return ServiceResponse::from_error(&err);
            }
        };

        let mut slot = self.slot.lock().await;
        if !response.is_ok() {
            scout_info!("Validation refused: {}", response.status);
            slot.close().await;
            self.store.apply(Msg::SessionChanged {
                license_id: None,
                active: false,
            });
            return response;
        }

        let (Some(license_id), Some(token)) = (response.license_id, response.session_token.clone())
        else {
            scout_warn!("Validation answered OK without a license id or session token");
            slot.close().await;
            self.store.apply(Msg::SessionChanged {
                license_id: None,
                active: false,
            });
            return ServiceResponse::status(Status::Error)
                .with_message("validation response lacks license_id or session_token");
        };

        // The old loop is fully stopped before its successor starts.
        slot.close().await;
        let session = SessionCredentials {
            license_id,
            machine_hash: self.machine_hash.clone(),
            session_token: token.clone(),
        };
        slot.license_id = Some(license_id);
        slot.token = Some(token);
        slot.heartbeat = Some(HeartbeatLoop::spawn(
            self.service.clone(),
            session,
            self.heartbeat.clone(),
        ));
        drop(slot);

        scout_info!("Session started for license {}", license_id);
        self.store.apply(Msg::SessionChanged {
            license_id: Some(license_id),
            active: true,
        });
        response
    }

    /// Ends the live session. A service answering `UNSUPPORTED` still ends it
    /// locally; the token is never reused afterwards.
    pub async fn end_session(&self) -> ServiceResponse {
        let mut slot = self.slot.lock().await;
        let (Some(license_id), Some(token)) = (slot.license_id, slot.token.clone()) else {
            return ServiceResponse::status(Status::NoSession);
        };
        let session = SessionCredentials {
            license_id,
            machine_hash: self.machine_hash.clone(),
            session_token: token,
        };
        let response = match self.service.end_session(&session).await {
            Ok(response) => response,
            Err(err) => {
                scout_warn!("Ending session for license {} failed: {}", license_id, err);
                return ServiceResponse::from_error(&err);
            }
        };
        if matches!(response.status, Status::Ok | Status::Unsupported) {
            slot.close().await;
            drop(slot);
            scout_info!("Session for license {} ended ({})", license_id, response.status);
            self.store.apply(Msg::SessionChanged {
                license_id: None,
                active: false,
            });
        }
        response
    }

    pub async fn has_session(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.license_id.is_some() && slot.token.is_some()
    }

    /// Number of heartbeat loops still running; at most one.
    pub async fn live_heartbeats(&self) -> usize {
        let slot = self.slot.lock().await;
        slot.heartbeat
            .as_ref()
            .map_or(0, |heartbeat| usize::from(!heartbeat.is_finished()))
    }

    /// Stops the heartbeat without telling the service.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        slot.close().await;
        self.store.apply(Msg::SessionChanged {
            license_id: None,
            active: false,
        });
    }
}
