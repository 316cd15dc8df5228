// Uniform capability contract realized by every authentication backend

use async_trait::async_trait;

use crate::scraper::errors::FetchError;
use crate::scraper::models::{Comment, Credential, ProviderKind, SessionHandle, Shortcode};

/// One authentication/scraping backend behind the uniform contract.
///
/// Providers hold their own in-memory session state; the SessionManager owns
/// their lifecycle and is the only component that interprets outcomes as
/// state transitions.
#[async_trait]
pub trait CommentProvider: Send + Sync {
    /// Which backend this is (drives priority and session file naming).
    fn kind(&self) -> ProviderKind;

    /// Whether the backend's environment prerequisites are present at all
    /// (installed browser, chromedriver binary). Absence is a normal Dead
    /// transition, never a startup failure.
    fn is_available(&self) -> bool {
        true
    }

    /// Hydrate in-memory state from a persisted handle. Local-only apart
    /// from deserialization; whether the session is actually accepted is
    /// validate()'s job.
    async fn load_session(&mut self, handle: &SessionHandle) -> bool;

    /// Perform a fresh authentication. On failure no partial state may
    /// remain that would make later calls misbehave.
    async fn login(&mut self, credential: &Credential) -> bool;

    /// Confirm the current session is accepted by the remote service.
    ///
    /// Explicitly denied (401/403) is false. Uncertain outcomes (timeouts,
    /// server errors) count as valid so a flaky network never forces a
    /// needless re-login.
    async fn validate(&mut self) -> bool;

    /// Best-effort low-risk read right after a fresh login, registering the
    /// session before real traffic. Failures are logged, never propagated.
    async fn warm_up(&mut self, username: &str);

    /// Fetch up to `limit` comments for a post, in remote-native order.
    async fn fetch_comments(
        &self,
        shortcode: &Shortcode,
        limit: usize,
    ) -> Result<Vec<Comment>, FetchError>;

    /// Snapshot of the current session for persistence, if one exists.
    fn session_handle(&self) -> Option<SessionHandle>;
}
