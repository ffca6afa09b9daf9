mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use scout_core::{Status, StoreState};
use scout_engine::{
    CredentialStore, FailureKind, HeartbeatSettings, LicenseCredential, LicenseError,
    LicenseService, LicenseSessionManager, ServiceResponse, SessionCredentials, SharedStateStore,
};
use tempfile::TempDir;

#[derive(Default)]
struct FakeService {
    issued: AtomicUsize,
    refuse: AtomicBool,
    offline: AtomicBool,
    end_unsupported: AtomicBool,
    failing_heartbeats: AtomicBool,
    stalled_heartbeats: AtomicBool,
    heartbeat_attempts: AtomicUsize,
    heartbeats: Mutex<HashMap<String, usize>>,
    ended: Mutex<Vec<String>>,
}

impl FakeService {
    fn beats(&self, token: &str) -> usize {
        self.heartbeats
            .lock()
            .unwrap()
            .get(token)
            .copied()
            .unwrap_or(0)
    }

    fn offline_error() -> LicenseError {
        LicenseError {
            kind: FailureKind::Network,
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LicenseService for FakeService {
    async fn activate(&self, key: &str, _machine: &str) -> Result<ServiceResponse, LicenseError> {
        if key != "ABC-123" {
            return Ok(ServiceResponse::status(Status::from("INVALID_KEY")));
        }
        Ok(ServiceResponse {
            license_id: Some(7),
            ..ServiceResponse::status(Status::Ok)
        })
    }

    async fn validate(&self, _key: &str, _machine: &str) -> Result<ServiceResponse, LicenseError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::offline_error());
        }
        if self.refuse.load(Ordering::SeqCst) {
            return Ok(ServiceResponse::status(Status::from("EXPIRED")));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ServiceResponse {
            license_id: Some(7),
            session_token: Some(format!("tok-{n}")),
            ..ServiceResponse::status(Status::Ok)
        })
    }

    async fn heartbeat(
        &self,
        session: &SessionCredentials,
    ) -> Result<ServiceResponse, LicenseError> {
        self.heartbeat_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_heartbeats.load(Ordering::SeqCst) {
            return Err(Self::offline_error());
        }
        if self.stalled_heartbeats.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        *self
            .heartbeats
            .lock()
            .unwrap()
            .entry(session.session_token.clone())
            .or_default() += 1;
        Ok(ServiceResponse::status(Status::Ok))
    }

    async fn end_session(
        &self,
        session: &SessionCredentials,
    ) -> Result<ServiceResponse, LicenseError> {
        self.ended
            .lock()
            .unwrap()
            .push(session.session_token.clone());
        if self.end_unsupported.load(Ordering::SeqCst) {
            return Ok(ServiceResponse::status(Status::Unsupported));
        }
        Ok(ServiceResponse::status(Status::Ok))
    }
}

struct Fixture {
    _dir: TempDir,
    credential_path: std::path::PathBuf,
    service: Arc<FakeService>,
    store: Arc<SharedStateStore>,
    manager: LicenseSessionManager,
}

fn fixture(with_credential: bool) -> Fixture {
    common::init_logging();
    let dir = TempDir::new().unwrap();
    let credential_path = dir.path().join("license_state.json");
    let credentials = CredentialStore::new(credential_path.clone());
    if with_credential {
        credentials
            .save(&LicenseCredential {
                license_key: "ABC-123".to_string(),
                license_id: Some(7),
            })
            .unwrap();
    }
    let service = Arc::new(FakeService::default());
    let store = Arc::new(SharedStateStore::new(StoreState::default()));
    let manager = LicenseSessionManager::new(
        service.clone(),
        credentials,
        "machine".to_string(),
        HeartbeatSettings {
            interval: Duration::from_millis(10),
            call_timeout: Duration::from_millis(200),
        },
        store.clone(),
    );
    Fixture {
        _dir: dir,
        credential_path,
        service,
        store,
        manager,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn revalidation_replaces_the_heartbeat_loop() {
    let f = fixture(true);

    assert!(f.manager.validate().await.is_ok());
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(f.service.beats("tok-1") > 0);

    assert!(f.manager.validate().await.is_ok());
    let old_beats = f.service.beats("tok-1");
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(f.service.beats("tok-1"), old_beats);
    assert!(f.service.beats("tok-2") > 0);
    assert_eq!(f.manager.live_heartbeats().await, 1);
    assert!(f.store.snapshot().session_active);
}

#[tokio::test]
async fn validate_without_credential_reports_no_key() {
    let f = fixture(false);
    let response = f.manager.validate().await;
    assert_eq!(response.status, Status::NoKey);
    assert!(!f.manager.has_session().await);
    assert!(!f.store.snapshot().is_activated);
}

#[tokio::test]
async fn activation_persists_the_credential() {
    let f = fixture(false);

    let response = f.manager.activate("  ABC-123 ").await;
    assert_eq!(response.status, Status::Ok);

    let stored = CredentialStore::new(f.credential_path.clone())
        .load()
        .expect("credential written");
    assert_eq!(stored.license_key, "ABC-123");
    assert_eq!(stored.license_id, Some(7));

    let snapshot = f.store.snapshot();
    assert!(snapshot.is_activated);
    assert_eq!(snapshot.license_id, Some(7));
}

#[tokio::test]
async fn refused_or_empty_activation_stores_nothing() {
    let f = fixture(false);

    assert_eq!(f.manager.activate("   ").await.status, Status::NoKey);
    assert_eq!(
        f.manager.activate("WRONG").await.status,
        Status::Other("INVALID_KEY".to_string())
    );
    assert!(!f.credential_path.exists());
    assert!(!f.store.snapshot().is_activated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ending_twice_reports_no_session() {
    let f = fixture(true);
    assert!(f.manager.validate().await.is_ok());

    assert_eq!(f.manager.end_session().await.status, Status::Ok);
    assert_eq!(f.manager.end_session().await.status, Status::NoSession);
    assert_eq!(f.manager.live_heartbeats().await, 0);
    assert_eq!(f.service.ended.lock().unwrap().clone(), vec!["tok-1"]);

    let settled = f.service.beats("tok-1");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.service.beats("tok-1"), settled);
    assert!(!f.store.snapshot().session_active);
}

#[tokio::test]
async fn unsupported_end_still_ends_locally() {
    let f = fixture(true);
    f.service.end_unsupported.store(true, Ordering::SeqCst);
    assert!(f.manager.validate().await.is_ok());

    assert_eq!(f.manager.end_session().await.status, Status::Unsupported);
    assert!(!f.manager.has_session().await);
}

#[tokio::test]
async fn refused_validation_drops_the_session() {
    let f = fixture(true);
    assert!(f.manager.validate().await.is_ok());

    f.service.refuse.store(true, Ordering::SeqCst);
    let response = f.manager.validate().await;
    assert_eq!(response.status, Status::Other("EXPIRED".to_string()));
    assert!(!f.manager.has_session().await);
    assert_eq!(f.manager.live_heartbeats().await, 0);
}

#[tokio::test]
async fn transport_failure_leaves_the_session_alone() {
    let f = fixture(true);
    assert!(f.manager.validate().await.is_ok());

    f.service.offline.store(true, Ordering::SeqCst);
    let response = f.manager.validate().await;
    assert_eq!(response.status, Status::Error);
    assert!(response.message.unwrap().contains("connection refused"));
    assert!(f.manager.has_session().await);

    let check = f.manager.check().await;
    assert_eq!(check.status, Status::Error);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_heartbeats_keep_the_loop_ticking() {
    let f = fixture(true);
    f.service.failing_heartbeats.store(true, Ordering::SeqCst);

    assert!(f.manager.validate().await.is_ok());
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(f.service.heartbeat_attempts.load(Ordering::SeqCst) > 1);
    assert_eq!(f.service.beats("tok-1"), 0);
    assert_eq!(f.manager.live_heartbeats().await, 1);
    assert!(f.manager.has_session().await);
    assert!(f.store.snapshot().session_active);

    f.service.failing_heartbeats.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(f.service.beats("tok-1") > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_heartbeats_time_out_and_retry() {
    let f = fixture(true);
    f.service.stalled_heartbeats.store(true, Ordering::SeqCst);

    assert!(f.manager.validate().await.is_ok());
    tokio::time::sleep(Duration::from_millis(600)).await;

    // Each call is abandoned at the 200ms timeout, so none completes.
    assert!(f.service.heartbeat_attempts.load(Ordering::SeqCst) >= 2);
    assert_eq!(f.service.beats("tok-1"), 0);
    assert_eq!(f.manager.live_heartbeats().await, 1);
    assert!(f.manager.has_session().await);
}
