//! Row-level logging gate for protected health information.
//!
//! Patient identifiers and clinical values may only reach the logs when the
//! operator explicitly opts in; until then every row-level value is replaced
//! with a redaction token. The gate is process-global so library crates can
//! consult it without threading configuration through every call.

use std::sync::atomic::{AtomicBool, Ordering};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder used when row-level logging is disabled.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Enable or disable row-level logging. Called once at startup.
pub fn set_log_data_enabled(enabled: bool) {
    LOG_DATA_ENABLED.store(enabled, Ordering::Release);
}

/// Returns true if row-level logging is explicitly enabled.
pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Relaxed)
}

/// Returns the input value when row-level logging is enabled, otherwise a
/// redacted token.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test: the gate is process-global state
    #[test]
    fn values_are_redacted_unless_explicitly_enabled() {
        assert!(!log_data_enabled());
        assert_eq!(redact_value("mrn-12345"), REDACTED_VALUE);
        set_log_data_enabled(true);
        assert_eq!(redact_value("mrn-12345"), "mrn-12345");
        set_log_data_enabled(false);
        assert_eq!(redact_value("mrn-12345"), REDACTED_VALUE);
    }
}
