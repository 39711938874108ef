// ── Core error types ──
//
// User-facing errors from wiser-core. Consumers never see reqwest or
// serde errors directly: the `From<wiser_api::Error>` impl folds them into
// the five categories callers act on. `Clone` so one failed poll tick can
// be handed to every caller waiting on it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Hub access ───────────────────────────────────────────────────
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Worth retrying (connect failure, timeout, 5xx).
        transient: bool,
    },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        /// Name of the first offending field.
        field: String,
    },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("Cannot find device ({tag}) {id}")]
    NotFound { tag: String, id: String },

    #[error("Unknown device family: {tag}")]
    UnknownFamily { tag: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn not_found(tag: &str, id: impl ToString) -> Self {
        Self::NotFound {
            tag: tag.to_owned(),
            id: id.to_string(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { transient: true, .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wiser_api::Error> for CoreError {
    fn from(err: wiser_api::Error) -> Self {
        let transient = err.is_transient();
        match err {
            wiser_api::Error::Transport(ref e) => CoreError::Network {
                message: e.to_string(),
                transient,
            },
            wiser_api::Error::Status { status, body } => CoreError::Network {
                message: if body.is_empty() {
                    format!("hub responded with HTTP {status}")
                } else {
                    format!("hub responded with HTTP {status}: {body}")
                },
                transient,
            },
            wiser_api::Error::InvalidUrl(e) => CoreError::Configuration {
                message: format!("Invalid hub endpoint: {e}"),
            },
            wiser_api::Error::InvalidHeader { name } => CoreError::Configuration {
                message: format!("Invalid value for header {name}"),
            },
            wiser_api::Error::Parse { message, body: _ } => CoreError::Parse { message },
            wiser_api::Error::Validation(v) => CoreError::Validation {
                field: v.field().to_owned(),
                message: v.to_string(),
            },
            wiser_api::Error::UnknownFamily(tag) => CoreError::UnknownFamily { tag },
            wiser_api::Error::DuplicateFamily(tag) => {
                CoreError::Internal(format!("device family {tag} registered twice"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiser_api::ValidationError;

    #[test]
    fn not_found_message_names_family_and_id() {
        let err = CoreError::not_found("Light", 42);
        assert_eq!(err.to_string(), "Cannot find device (Light) 42");
    }

    #[test]
    fn validation_keeps_field_name() {
        let api = wiser_api::Error::Validation(ValidationError::missing("Light", "TargetPercentage"));
        let err = CoreError::from(api);

        assert!(matches!(
            err,
            CoreError::Validation { ref field, .. } if field == "TargetPercentage"
        ));
        assert!(err.to_string().contains("TargetPercentage"));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = CoreError::from(wiser_api::Error::Status {
            status: 502,
            body: String::new(),
        });
        assert!(err.is_transient());

        let err = CoreError::from(wiser_api::Error::Status {
            status: 404,
            body: String::new(),
        });
        assert!(!err.is_transient());
    }
}
