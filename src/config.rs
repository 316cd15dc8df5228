// Static application configuration, read once at startup

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::scraper::models::{clean_credential, mask_secret, Credential};

pub const DEFAULT_MAX_COMMENTS: usize = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SESSION_FILE: &str = "SessionFiles/primary_session.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    /// Primary session file; every other provider's file is derived from it.
    pub session_file: PathBuf,
    /// Hard cap on returned comments, applied by truncation.
    pub max_comments: usize,
    /// Bound on every external network call.
    pub request_timeout: Duration,
    /// chromedriver binary for the interactive fallback, if installed.
    pub chromedriver_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            max_comments: DEFAULT_MAX_COMMENTS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chromedriver_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading a `.env` file first
    /// when one exists. Credentials get their accidental quoting stripped
    /// here; a missing credential is only warned about, the hard failure
    /// happens when the session manager is constructed.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let username = std::env::var("INSTAGRAM_USERNAME")
            .map(|v| clean_credential(&v))
            .unwrap_or_default();
        let password = std::env::var("INSTAGRAM_PASSWORD")
            .map(|v| clean_credential(&v))
            .unwrap_or_default();

        if username.is_empty() || password.is_empty() {
            warn!("instagram credentials not found in environment");
        } else {
            tracing::info!(
                username = %username,
                password = %mask_secret(&password),
                "credentials loaded"
            );
        }

        let session_file = std::env::var("INSTAGRAM_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        let max_comments = std::env::var("MAX_COMMENTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_COMMENTS);

        let request_timeout = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let chromedriver_path = std::env::var("CHROMEDRIVER_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            username,
            password,
            session_file,
            max_comments,
            request_timeout,
            chromedriver_path,
        }
    }

    pub fn credential(&self) -> Credential {
        Credential::new(&self.username, &self.password)
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = clean_credential(username);
        self.password = clean_credential(password);
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_max_comments(mut self, max: usize) -> Self {
        self.max_comments = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_chromedriver(mut self, path: Option<PathBuf>) -> Self {
        self.chromedriver_path = path;
        self
    }
}
