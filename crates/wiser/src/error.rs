//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wiser_config::ConfigError;
use wiser_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the hub: {message}")]
    #[diagnostic(
        code(wiser::connection_failed),
        help(
            "Check that the hub is powered and reachable from this machine.\n\
             Try: wiser --endpoint <host> snapshot"
        )
    )]
    ConnectionFailed { message: String },

    // ── Hub data ─────────────────────────────────────────────────────
    #[error("Hub returned data that could not be read: {message}")]
    #[diagnostic(code(wiser::bad_response))]
    BadResponse { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{tag} '{id}' not found")]
    #[diagnostic(
        code(wiser::not_found),
        help("Run: wiser snapshot to see available records")
    )]
    NotFound { tag: String, id: String },

    #[error("Unknown device family '{tag}'")]
    #[diagnostic(code(wiser::unknown_family), help("Supported families: Light, Shutter"))]
    UnknownFamily { tag: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wiser::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No hub configured")]
    #[diagnostic(
        code(wiser::no_config),
        help(
            "Create a profile with: wiser config set-profile default --endpoint <host>\n\
             Or pass --endpoint / set WISER_ENDPOINT.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(wiser::config))]
    Config(Box<ConfigError>),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {message}")]
    #[diagnostic(code(wiser::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(wiser::json), help("Pass the request body as a single JSON object."))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::UnknownFamily { .. } | Self::Json(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { message, .. } => CliError::ConnectionFailed { message },
            CoreError::Parse { message } | CoreError::Validation { message, .. } => {
                CliError::BadResponse { message }
            }
            CoreError::NotFound { tag, id } => CliError::NotFound { tag, id },
            CoreError::UnknownFamily { tag } => CliError::UnknownFamily { tag },
            CoreError::Configuration { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let err = CliError::from(CoreError::NotFound {
            tag: "Light".into(),
            id: "9".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "Light '9' not found");

        let err = CliError::from(CoreError::Network {
            message: "refused".into(),
            transient: true,
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);

        let err = CliError::from(CoreError::UnknownFamily {
            tag: "Heating".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
