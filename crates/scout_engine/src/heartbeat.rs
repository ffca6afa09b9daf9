use std::sync::Arc;
use std::time::Duration;

use scout_logging::{scout_debug, scout_trace, scout_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{LicenseService, SessionCredentials};

#[derive(Debug, Clone)]
pub struct HeartbeatSettings {
    /// Pause between the end of one call and the start of the next.
    pub interval: Duration,
    /// Upper bound for a single heartbeat call.
    pub call_timeout: Duration,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Periodic keep-alive bound to one session.
///
/// Failures of individual ticks are logged and retried on the next tick; the
/// loop only ends through [`HeartbeatLoop::stop`] or when dropped.
pub struct HeartbeatLoop {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatLoop {
    /// Spawns the loop on the current tokio runtime.
    pub fn spawn(
        service: Arc<dyn LicenseService>,
        session: SessionCredentials,
        settings: HeartbeatSettings,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            run(service.as_ref(), &session, &settings, &token).await;
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stops the loop and waits until it has exited.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                scout_warn!("Heartbeat loop ended abnormally: {}", err);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for HeartbeatLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    service: &dyn LicenseService,
    session: &SessionCredentials,
    settings: &HeartbeatSettings,
    cancel: &CancellationToken,
) {
    let mut tick: u64 = 0;
    loop {
        tick += 1;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = tokio::time::timeout(settings.call_timeout, service.heartbeat(session)) => {
                match outcome {
                    Ok(Ok(response)) if response.is_ok() => {
                        scout_trace!("Heartbeat #{} ok for license {}", tick, session.license_id);
                    }
                    Ok(Ok(response)) => {
                        scout_warn!("Heartbeat #{} rejected: {}", tick, response.status);
                    }
                    Ok(Err(err)) => scout_warn!("Heartbeat #{} failed: {}", tick, err),
                    Err(_) => scout_warn!(
                        "Heartbeat #{} timed out after {:?}",
                        tick,
                        settings.call_timeout
                    ),
                }
            }
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
    scout_debug!(
        "Heartbeat loop for license {} stopped after {} ticks",
        session.license_id,
        tick
    );
}
