// Primary provider - session-file based login against the web API
//
// The default backend: cheapest to warm up and the one whose session file
// sits at the configured primary path.

use async_trait::async_trait;
use tracing::{info, warn};

use super::web::{WebApiClient, SESSION_COOKIE, WEB_USER_AGENT};
use crate::scraper::errors::FetchError;
use crate::scraper::models::{Comment, Credential, ProviderKind, SessionHandle, Shortcode};
use crate::scraper::traits::CommentProvider;

pub struct PrimaryProvider {
    web: WebApiClient,
    username: Option<String>,
}

impl PrimaryProvider {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self {
            web: WebApiClient::new(timeout),
            username: None,
        }
    }
}

#[async_trait]
impl CommentProvider for PrimaryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    async fn load_session(&mut self, handle: &SessionHandle) -> bool {
        self.web.cookies.clear();
        self.web.cookies.load_stored(&handle.cookies);
        if !self.web.has_session_cookie() {
            warn!("primary session file carries no {SESSION_COOKIE} cookie");
            self.web.cookies.clear();
            return false;
        }
        self.username = Some(handle.username.clone());
        true
    }

    async fn login(&mut self, credential: &Credential) -> bool {
        info!(username = %credential.username, "primary login");
        match self.web.login(&credential.username, &credential.password).await {
            Ok(true) => {
                self.username = Some(credential.username.clone());
                true
            }
            Ok(false) => {
                warn!("primary login rejected");
                self.web.cookies.clear();
                self.username = None;
                false
            }
            Err(e) => {
                warn!(error = %e, "primary login failed");
                self.web.cookies.clear();
                self.username = None;
                false
            }
        }
    }

    async fn validate(&mut self) -> bool {
        self.web.validate_session().await
    }

    async fn warm_up(&mut self, username: &str) {
        match self.web.profile_lookup(username).await {
            Ok(()) => info!("primary session warmed up"),
            Err(e) => warn!(error = %e, "primary warm-up skipped"),
        }
    }

    async fn fetch_comments(
        &self,
        shortcode: &Shortcode,
        limit: usize,
    ) -> Result<Vec<Comment>, FetchError> {
        info!(%shortcode, "scraping via primary");
        self.web.fetch_comments(shortcode.media_pk(), limit).await
    }

    fn session_handle(&self) -> Option<SessionHandle> {
        let username = self.username.as_deref()?;
        if !self.web.has_session_cookie() {
            return None;
        }
        let mut handle = SessionHandle::new(username);
        handle.cookies = self.web.cookies.to_stored(".instagram.com");
        handle.user_agent = Some(WEB_USER_AGENT.to_string());
        Some(handle)
    }
}
