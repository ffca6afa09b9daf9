use std::fmt::Write;
use std::fs;

use sha2::{Digest, Sha256};

/// Files holding a stable per-installation machine id, in lookup order.
const MACHINE_ID_FILES: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Raw machine identity: the OS machine id, else the host name.
pub fn machine_guid() -> String {
    MACHINE_ID_FILES
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|content| content.trim().to_string())
        .find(|id| !id.is_empty())
        .or_else(sysinfo::System::host_name)
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Salted SHA-256 of the machine identity, lowercase hex.
pub fn machine_hash(salt: &str) -> String {
    fingerprint_of(&machine_guid(), salt)
}

pub fn fingerprint_of(guid: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(guid.as_bytes());
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_salted_sha256_hex() {
        // sha256("abc")
        assert_eq!(
            fingerprint_of("a", "bc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn machine_hash_is_stable() {
        assert_eq!(machine_hash("salt"), machine_hash("salt"));
        assert_ne!(machine_hash("salt"), machine_hash("other"));
        assert_eq!(machine_hash("salt").len(), 64);
    }
}
