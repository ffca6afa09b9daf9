use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use scout_core::LicenseId;
use scout_logging::{redact, scout_info, scout_warn};
use serde::{Deserialize, Serialize};

use crate::{AtomicFile, PersistError};

/// Default file name of the persisted credential.
pub const CREDENTIAL_FILENAME: &str = "license_state.json";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseCredential {
    pub license_key: String,
    #[serde(default)]
    pub license_id: Option<LicenseId>,
}

impl fmt::Debug for LicenseCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseCredential")
            .field("license_key", &redact(&self.license_key))
            .field("license_id", &self.license_id)
            .finish()
    }
}

/// Small JSON document holding the activated license key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the credential; unreadable or keyless documents count as absent.
    pub fn load(&self) -> Option<LicenseCredential> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                scout_warn!("Failed to read credential from {:?}: {}", self.path, err);
                return None;
            }
        };
        match serde_json::from_str::<LicenseCredential>(&content) {
            Ok(credential) if !credential.license_key.trim().is_empty() => Some(credential),
            Ok(_) => None,
            Err(err) => {
                scout_warn!("Failed to parse credential from {:?}: {}", self.path, err);
                None
            }
        }
    }

    pub fn save(&self, credential: &LicenseCredential) -> Result<(), PersistError> {
        let content = serde_json::to_vec(credential)?;
        AtomicFile::new(&self.path).write(&content)?;
        scout_info!(
            "Stored credential {} (license {:?}) at {:?}",
            redact(&credential.license_key),
            credential.license_id,
            self.path
        );
        Ok(())
    }
}
