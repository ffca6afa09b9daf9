use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use scout_core::{Features, ScrapeDefaults, DEFAULT_RESULT_CAPACITY};

use crate::{HeartbeatSettings, LicenseSettings, CLIENT_CONFIG_FILENAME, CREDENTIAL_FILENAME};

const APP_DIR_NAME: &str = "PDDScraper";

pub const ENV_API_BASE: &str = "LICENSE_API_BASE";
pub const ENV_SALT: &str = "LICENSE_SALT";
pub const ENV_DATA_DIR: &str = "SCOUT_DATA_DIR";
pub const ENV_PROFILE: &str = "SCOUT_PROFILE";

/// How the per-run output file is named inside the export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub prefix: String,
    pub extension: String,
    /// Append a `_YYYYmmdd_HHMMSS` stamp so runs never overwrite each other.
    pub timestamped: bool,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            prefix: "pdd_results".to_string(),
            extension: "xlsx".to_string(),
            timestamped: true,
        }
    }
}

impl OutputNaming {
    pub fn file_name(&self, at: DateTime<Local>) -> String {
        if self.timestamped {
            format!(
                "{}_{}.{}",
                self.prefix,
                at.format("%Y%m%d_%H%M%S"),
                self.extension
            )
        } else {
            format!("{}.{}", self.prefix, self.extension)
        }
    }

    pub fn path_in(&self, dir: &Path, at: DateTime<Local>) -> PathBuf {
        dir.join(self.file_name(at))
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub license: LicenseSettings,
    pub heartbeat: HeartbeatSettings,
    pub fingerprint_salt: String,
    /// Holds the credential and the client config file.
    pub data_dir: PathBuf,
    pub features: Features,
    pub result_capacity: usize,
    pub output: OutputNaming,
    pub defaults: ScrapeDefaults,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::default_with_data_dir(default_data_dir())
    }
}

impl BridgeConfig {
    pub fn default_with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            license: LicenseSettings::default(),
            heartbeat: HeartbeatSettings::default(),
            fingerprint_salt: "dev-salt-change".to_string(),
            data_dir,
            features: Features::default(),
            result_capacity: DEFAULT_RESULT_CAPACITY,
            output: OutputNaming::default(),
            defaults: ScrapeDefaults::default(),
        }
    }

    /// Plain profile: no statistics, no result buffer, one fixed output name.
    pub fn basic(mut self) -> Self {
        self.features = Features::basic();
        self.output.timestamped = false;
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = non_empty(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let mut config = Self::default_with_data_dir(data_dir);
        if let Some(base) = non_empty(ENV_API_BASE) {
            config.license.base_url = base;
        }
        if let Some(salt) = non_empty(ENV_SALT) {
            config.fingerprint_salt = salt;
        }
        if non_empty(ENV_PROFILE).is_some_and(|p| p.trim().eq_ignore_ascii_case("basic")) {
            config = config.basic();
        }
        config
    }

    pub fn credential_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIAL_FILENAME)
    }

    pub fn client_config_path(&self) -> PathBuf {
        self.data_dir.join(CLIENT_CONFIG_FILENAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
