//! The `app.ini` file remembering the last picked export directory.

use std::fs;
use std::path::{Path, PathBuf};

use scout_logging::scout_warn;

use crate::{AtomicFile, PersistError};

pub const CLIENT_CONFIG_FILENAME: &str = "app.ini";

const SECTION: &str = "client";
const EXPORT_DIR_KEY: &str = "export_dir";

#[derive(Debug, Clone)]
pub struct ClientConfigFile {
    path: PathBuf,
}

impl ClientConfigFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_export_dir(&self) -> Option<PathBuf> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                scout_warn!("Failed to read {:?}: {}", self.path, err);
                return None;
            }
        };
        parse_value(&content, SECTION, EXPORT_DIR_KEY).map(PathBuf::from)
    }

    pub fn save_export_dir(&self, dir: &Path) -> Result<(), PersistError> {
        let content = format!("[{SECTION}]\n{EXPORT_DIR_KEY}={}\n", dir.display());
        AtomicFile::new(&self.path).write(content.as_bytes())
    }
}

/// Looks up `key` in `section` of a key=value document.
///
/// Keys before any section header are treated as belonging to every section.
fn parse_value(content: &str, section: &str, key: &str) -> Option<String> {
    let mut current: Option<&str> = None;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(name.trim());
            continue;
        }
        if current.is_some_and(|name| !name.eq_ignore_ascii_case(section)) {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let value = v.trim();
            if k.trim() == key && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
