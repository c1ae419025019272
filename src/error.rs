//! Error types for the test kit.
//!
//! Two layers of errors exist:
//!
//! - [`ConfigError`] — configuration problems (unknown or removed settings,
//!   malformed values, status tables with no usable entry, user-factory
//!   resolution failures). These are always fatal and are raised at the point
//!   of resolution; the kit never retries or swallows them.
//! - [`TestKitError`] — everything a harness operation can surface: a
//!   configuration error, a missing endpoint path (the concrete test forgot
//!   to configure one), or a status-code mismatch, which is the one
//!   *expected* failure mode of the kit.
//!
//! Assertion entry points on the harness panic with the formatted error so a
//! failing test reads naturally; the `verify_*` twins return
//! [`TestKitResult`] for programmatic use.

use thiserror::Error;

use crate::status::Method;

/// Errors raised while resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested setting name is not part of the recognized set.
    #[error("unknown setting '{key}'")]
    UnknownSetting {
        /// The requested setting name.
        key: String,
    },

    /// The override mapping contains a setting that has been retired.
    #[error("the '{key}' setting has been removed; see https://docs.rs/api-testkit for the current settings")]
    RemovedSetting {
        /// The retired setting name.
        key: String,
    },

    /// A setting value could not be parsed into its expected shape.
    #[error("invalid value for setting '{key}': {message}")]
    InvalidValue {
        /// The setting name.
        key: String,
        /// What was wrong with the value.
        message: String,
    },

    /// A status table has neither a method-specific entry nor an `ALL` entry.
    #[error("no status code configured for {method} in {table}; add a '{method}' or 'ALL' entry")]
    MissingStatus {
        /// Rendered form of the offending table.
        table: String,
        /// The method that was looked up.
        method: Method,
    },

    /// A user-factory path did not resolve against the registry.
    #[error("could not resolve setting '{key}': no user factory registered under '{path}'")]
    UnknownUserFactory {
        /// The setting name being resolved.
        key: String,
        /// The factory path that was looked up.
        path: String,
    },
}

/// The primary error type for harness operations.
#[derive(Error, Debug)]
pub enum TestKitError {
    /// Configuration problem surfaced during a harness operation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The concrete test never configured an endpoint path.
    #[error("no API url configured; set one with `with_api_url`")]
    MissingApiUrl,

    /// The response status code did not match the expectation.
    #[error("A {method} request on {path} returned {actual} but should be {expected}.")]
    StatusMismatch {
        /// The HTTP method that was issued.
        method: Method,
        /// The endpoint path the request was issued against.
        path: String,
        /// The status code the response actually carried.
        actual: u16,
        /// The status code the table resolved to.
        expected: u16,
    },
}

/// Result type alias for harness operations.
pub type TestKitResult<T> = Result<T, TestKitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_setting_display() {
        let err = ConfigError::UnknownSetting {
            key: "RETRY_BUDGET".to_string(),
        };
        assert_eq!(err.to_string(), "unknown setting 'RETRY_BUDGET'");
    }

    #[test]
    fn test_removed_setting_points_at_docs() {
        let err = ConfigError::RemovedSetting {
            key: "DEFAULT_STATUS_ANONYMOUS".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DEFAULT_STATUS_ANONYMOUS"));
        assert!(msg.contains("https://docs.rs/api-testkit"));
    }

    #[test]
    fn test_status_mismatch_wording() {
        let err = TestKitError::StatusMismatch {
            method: Method::Get,
            path: "/widgets/".to_string(),
            actual: 200,
            expected: 403,
        };
        assert_eq!(
            err.to_string(),
            "A GET request on /widgets/ returned 200 but should be 403."
        );
    }

    #[test]
    fn test_missing_status_names_method_and_table() {
        let err = ConfigError::MissingStatus {
            table: "{}".to_string(),
            method: Method::Delete,
        };
        let msg = err.to_string();
        assert!(msg.contains("DELETE"));
        assert!(msg.contains("'ALL'"));
    }
}
