// Failure-driven failover across the provider chain
//
// The sole entry point the web layer calls. Tries providers strictly in
// priority order; an auth-class failure condemns the provider and moves on,
// a post-specific failure surfaces immediately so a working session is
// never thrown away over a deleted post.

use tracing::{info, warn};

use crate::config::Config;
use crate::scraper::errors::FetchError;
use crate::scraper::manager::SessionManager;
use crate::scraper::models::{Comment, Shortcode};

pub struct FetchCoordinator {
    manager: SessionManager,
    max_comments: usize,
}

impl FetchCoordinator {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            manager: SessionManager::new(config)?,
            max_comments: config.max_comments,
        })
    }

    /// Assemble from an existing manager (tests, custom provider sets).
    pub fn with_manager(manager: SessionManager, max_comments: usize) -> Self {
        Self {
            manager,
            max_comments,
        }
    }

    /// Run the startup initialization policy once.
    pub async fn initialize(&mut self) {
        self.manager.initialize().await;
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Fetch the comments of one post, failing over through the provider
    /// chain as needed. The result is capped at the configured maximum by
    /// truncation, order untouched.
    ///
    /// Errors: ServiceUnavailable when no provider was ever usable; the
    /// last provider's auth error when the whole chain died mid-fetch;
    /// NotFound/Transient straight from the first provider that reported
    /// one.
    pub async fn fetch(&mut self, shortcode: &str) -> Result<Vec<Comment>, FetchError> {
        let code = Shortcode::parse(shortcode)?;
        let mut last_fault: Option<FetchError> = None;

        loop {
            let Some(idx) = self.manager.best_provider().await else {
                return Err(last_fault.unwrap_or(FetchError::ServiceUnavailable));
            };
            let kind = self.manager.kind_at(idx);

            match self
                .manager
                .provider(idx)
                .fetch_comments(&code, self.max_comments)
                .await
            {
                Ok(mut comments) => {
                    comments.truncate(self.max_comments);
                    info!(provider = %kind, %code, count = comments.len(), "scrape complete");
                    return Ok(comments);
                }
                Err(e) if e.is_session_fault() => {
                    warn!(provider = %kind, error = %e, "session fault, failing over");
                    self.manager.mark_dead(idx);
                    last_fault = Some(e);
                }
                Err(e) => {
                    // Post-specific: the session may still be fine for
                    // other posts, so no state transition happens.
                    warn!(provider = %kind, error = %e, "post-specific failure, surfacing");
                    return Err(e);
                }
            }
        }
    }
}
