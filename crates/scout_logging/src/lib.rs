#![deny(missing_docs)]
//! Shared logging utilities for the scout workspace.
//!
//! This crate provides the `scout_*` logging macros used across the codebase,
//! a helper for keeping secrets out of log lines, and a minimal test
//! initializer for the global logger.

/// Number of leading characters of a secret that survive redaction.
const REDACT_KEEP: usize = 4;

/// Renders a license key or session token in a log-safe form.
///
/// Only the first few characters are kept so that log lines remain
/// correlatable without leaking the credential.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    let kept: String = secret.chars().take(REDACT_KEEP).collect();
    if kept.chars().count() == secret.chars().count() {
        "…".to_string()
    } else {
        format!("{kept}…")
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! scout_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! scout_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! scout_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! scout_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! scout_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn long_secrets_keep_a_short_prefix() {
        assert_eq!(redact("ABC-123-XYZ"), "ABC-…");
    }

    #[test]
    fn short_secrets_are_fully_hidden() {
        assert_eq!(redact("abcd"), "…");
        assert_eq!(redact(""), "<empty>");
    }
}
