//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.
//! AI endpoint settings live in [`super::ai_config::AiConfig::from_env`].

use std::path::PathBuf;

/// Address the HTTP server binds to when `SITE_ADDR` is unset
pub const DEFAULT_SITE_ADDR: &str = "127.0.0.1:3000";

/// Credential file used when `CREDENTIALS_PATH` is unset
pub const DEFAULT_CREDENTIALS_PATH: &str = ".schemachat/credentials.json";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address for the HTTP server
    /// Example: 0.0.0.0:3000
    pub site_addr: String,

    /// JSON file holding stored credentials
    pub credentials_path: PathBuf,

    /// API key written to the credential store on startup if none is stored yet
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Self {
        Self {
            site_addr: std::env::var("SITE_ADDR").unwrap_or_else(|_| DEFAULT_SITE_ADDR.to_string()),
            credentials_path: std::env::var("CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            api_key: std::env::var("SCHEMACHAT_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
        }
    }

    /// Check if an API key seed is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
