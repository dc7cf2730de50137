//! Error types for the schema assistant and credential storage

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// How an assistant failure is surfaced to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or unreadable credential
    #[display("configuration")]
    Configuration,
    /// Network or service failure talking to the AI API
    #[display("collaborator")]
    Collaborator,
    /// The AI reply did not contain a usable schema
    #[display("parse")]
    Parse,
}

/// Errors from turning a description into a schema
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API key not found. Please set your API key in the settings.")]
    MissingApiKey,

    #[error("Could not read the stored API key: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Failed to connect to AI API: {0}")]
    Network(String),

    #[error("AI API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("AI API rate limit reached. Try again later.")]
    RateLimited,

    #[error("No valid JSON found in response")]
    NoJson,

    #[error("Invalid schema format: {0}")]
    InvalidSchema(String),
}

impl AiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AiError::MissingApiKey | AiError::Credentials(_) => ErrorCategory::Configuration,
            AiError::Network(_) | AiError::Api { .. } | AiError::RateLimited => {
                ErrorCategory::Collaborator
            }
            AiError::NoJson | AiError::InvalidSchema(_) => ErrorCategory::Parse,
        }
    }
}

#[cfg(feature = "ssr")]
impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Network(err.to_string())
    }
}

/// Errors from the credential store
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(AiError::MissingApiKey.category(), ErrorCategory::Configuration);
        assert_eq!(
            AiError::Network("timeout".into()).category(),
            ErrorCategory::Collaborator
        );
        assert_eq!(
            AiError::Api {
                status: 401,
                message: "unauthorized".into()
            }
            .category(),
            ErrorCategory::Collaborator
        );
        assert_eq!(AiError::RateLimited.category(), ErrorCategory::Collaborator);
        assert_eq!(AiError::NoJson.category(), ErrorCategory::Parse);
        assert_eq!(
            AiError::InvalidSchema("missing field `tables`".into()).category(),
            ErrorCategory::Parse
        );
    }

    #[test]
    fn test_credential_error_is_configuration() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AiError::from(CredentialError::from(io));
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_api_error_message() {
        let err = AiError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "AI API returned error: 500 - boom");
    }
}
