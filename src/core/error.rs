//! Error handling for package promotion
//!
//! This module provides the error taxonomy for the promotion workflow with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use thiserror::Error;

/// Main error type for promotion operations
#[derive(Error, Debug)]
pub enum PromoteError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("required setting `{name}` is not configured")]
    MissingSetting { name: String },

    // Platform errors
    #[error("[{operation}] authentication failed: {message}")]
    AuthenticationFailed { operation: String, message: String },

    #[error("[{operation}] resource not found: {message}")]
    NotFound { operation: String, message: String },

    #[error("[{operation}] platform returned HTTP {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("[{operation}] network error: {message}")]
    Network { operation: String, message: String },

    #[error("[{operation}] request timed out")]
    Timeout { operation: String },

    #[error("[{operation}] could not decode response: {message}")]
    Decode { operation: String, message: String },

    // Workflow errors
    #[error("package with {field} `{value}` not found in space {space_id}")]
    PackageNotFound {
        field: String,
        value: String,
        space_id: String,
    },

    #[error("package `{name}` was created but is missing from the refreshed listing")]
    PackageMissingAfterCreate { name: String },

    #[error("invalid stage transition for {role} package: {from} -> {to}")]
    InvalidTransition {
        role: String,
        from: String,
        to: String,
    },
}

impl PromoteError {
    /// Get the remote operation associated with this error, if any
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::AuthenticationFailed { operation, .. }
            | Self::NotFound { operation, .. }
            | Self::Api { operation, .. }
            | Self::Network { operation, .. }
            | Self::Timeout { operation }
            | Self::Decode { operation, .. } => Some(operation),
            Self::Config(_)
            | Self::MissingSetting { .. }
            | Self::PackageNotFound { .. }
            | Self::PackageMissingAfterCreate { .. }
            | Self::InvalidTransition { .. } => None,
        }
    }

    /// Check if the failed call may succeed when repeated unchanged
    ///
    /// Only transport failures, timeouts, throttling and server-side errors qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Config(_) => vec![
                "Check the syntax of .promote-config.yaml",
                "Check files referenced through `extends`",
            ],
            Self::MissingSetting { .. } => vec![
                "Set the value in .promote-config.yaml",
                "Or export it (CELONIS_URL, CELONIS_API_TOKEN, PROMOTE_SPACE_ID, \
                 PROMOTE_SOURCE_PACKAGE_KEY)",
                "Or pass it as a command line flag",
            ],
            Self::AuthenticationFailed { .. } => vec![
                "Check that the API token is valid and has not expired",
                "Check that CELONIS_KEY_TYPE matches the token (USER_KEY or APP_KEY)",
                "Check that the key has edit permissions on the space",
            ],
            Self::NotFound { .. } => vec![
                "Check the space id and package key",
                "Check that the team URL points at the right team",
            ],
            Self::Api { .. } => vec![
                "Read the response message above",
                "Retry later if the platform reports a server error",
            ],
            Self::Network { .. } => vec![
                "Check the internet connection",
                "Check the team URL",
            ],
            Self::Timeout { .. } => vec![
                "Increase request_timeout_secs",
                "Retry later",
            ],
            Self::Decode { .. } => vec![
                "The platform API may have changed; report the response body",
            ],
            Self::PackageNotFound { .. } => vec![
                "Check the source package key",
                "Check that the package lives in the configured space",
            ],
            Self::PackageMissingAfterCreate { .. } => vec![
                "Wait a moment and rerun; the space listing may lag behind",
            ],
            Self::InvalidTransition { .. } => vec![
                "This is a bug in the promotion sequence; please report it",
            ],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::MissingSetting { .. } => "MISSING_SETTING",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Api { .. } => "API_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Timeout { .. } => "TIMEOUT_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
            Self::PackageMissingAfterCreate { .. } => "PACKAGE_MISSING_AFTER_CREATE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}
