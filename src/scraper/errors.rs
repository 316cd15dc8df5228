// Error taxonomy for the scraping core
//
// Providers translate their internal failures into this taxonomy at the
// adapter boundary; nothing provider-specific leaks past it. The split that
// matters for correctness: AuthRequired triggers failover, NotFound/Transient
// are post-specific and surface immediately.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Session invalid or expired - the caller should fail over or re-login
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// Post missing, deleted, or never existed - not the session's fault
    #[error("post not found: {0}")]
    NotFound(String),

    /// Network hiccup, timeout, throttling - not the session's fault
    #[error("transient failure: {0}")]
    Transient(String),

    /// No provider could be activated at all
    #[error("no scraping provider available")]
    ServiceUnavailable,

    /// Missing or malformed configuration - detected before any network call
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    /// Map an HTTP status to the taxonomy.
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::AuthRequired(format!("{context}: HTTP {status}")),
            404 => Self::NotFound(format!("{context}: HTTP {status}")),
            408 | 429 => Self::Transient(format!("{context}: HTTP {status}")),
            s if s >= 500 => Self::Transient(format!("{context}: HTTP {status}")),
            _ => Self::Transient(format!("{context}: unexpected HTTP {status}")),
        }
    }

    /// Map a transport-level reqwest error to the taxonomy.
    ///
    /// Timeouts are Transient by contract: a hung call must never be blamed
    /// on the session.
    pub fn from_request(err: reqwest::Error, context: &str) -> Self {
        if err.is_timeout() {
            return Self::Transient(format!("{context}: timed out"));
        }
        if let Some(status) = err.status() {
            return Self::from_status(status, context);
        }
        Self::Transient(format!("{context}: {err}"))
    }

    /// Whether this failure condemns the session that produced it.
    ///
    /// Only these failures move a provider to Dead; everything else leaves
    /// provider state untouched.
    pub fn is_session_fault(&self) -> bool {
        matches!(self, Self::AuthRequired(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            FetchError::from_status(StatusCode::UNAUTHORIZED, "t"),
            FetchError::AuthRequired(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::FORBIDDEN, "t"),
            FetchError::AuthRequired(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::NOT_FOUND, "t"),
            FetchError::NotFound(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::TOO_MANY_REQUESTS, "t"),
            FetchError::Transient(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::BAD_GATEWAY, "t"),
            FetchError::Transient(_)
        ));
    }

    #[test]
    fn test_only_auth_is_session_fault() {
        assert!(FetchError::AuthRequired("x".into()).is_session_fault());
        assert!(!FetchError::NotFound("x".into()).is_session_fault());
        assert!(!FetchError::Transient("x".into()).is_session_fault());
        assert!(!FetchError::ServiceUnavailable.is_session_fault());
    }
}
