// Secondary provider - private mobile API with its own session format
//
// Alternate backend used once the primary is confirmed unusable. Speaks the
// i.instagram.com surface with an Android device identity and a bearer
// token instead of browser cookies, so its session file is a different
// shape from the primary's.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::{debug, info, warn};

use crate::scraper::errors::FetchError;
use crate::scraper::models::{
    unix_now, Comment, Credential, ProviderKind, SessionHandle, Shortcode,
};
use crate::scraper::traits::CommentProvider;

const MOBILE_BASE: &str = "https://i.instagram.com";

/// Android app identity for the mobile surface.
pub const MOBILE_USER_AGENT: &str = "Instagram 123.0.0.26.121 Android \
     (28/9; 320dpi; 720x1280; Xiaomi; Redmi Note 7; lavender; qcom; en_US)";

pub struct SecondaryProvider {
    http: reqwest::Client,
    device_id: String,
    guid: String,
    auth_token: Option<String>,
    username: Option<String>,
}

impl SecondaryProvider {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let guid = uuid::Uuid::new_v4().to_string();
        let device_id = Self::fresh_device_id();
        Self {
            http,
            device_id,
            guid,
            auth_token: None,
            username: None,
        }
    }

    /// Random Android device fingerprint. Kept in the session handle so a
    /// reloaded session presents the same device it logged in with.
    fn fresh_device_id() -> String {
        let seed = uuid::Uuid::new_v4();
        let bytes = seed.as_bytes();
        let mut tail: u64 = 0;
        for b in &bytes[..8] {
            tail = (tail << 8) | u64::from(*b);
        }
        format!("android-{tail:016x}")
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
        if let Some(token) = &self.auth_token {
            if let Ok(value) = HeaderValue::from_str(token) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        self.http.request(method, url).headers(headers)
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> Result<reqwest::Response, FetchError> {
        builder
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, context))
    }

    fn reset(&mut self) {
        self.auth_token = None;
        self.username = None;
    }
}

#[async_trait]
impl CommentProvider for SecondaryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Secondary
    }

    async fn load_session(&mut self, handle: &SessionHandle) -> bool {
        let Some(token) = handle.auth_token.clone() else {
            warn!("secondary session file carries no auth token");
            return false;
        };
        if let Some(device_id) = handle.device_id.clone() {
            self.device_id = device_id;
        }
        self.auth_token = Some(token);
        self.username = Some(handle.username.clone());
        true
    }

    async fn login(&mut self, credential: &Credential) -> bool {
        info!(username = %credential.username, "secondary login");
        let enc_password = format!(
            "#PWD_INSTAGRAM:4:{}:{}",
            unix_now(),
            credential.password
        );
        let url = format!("{MOBILE_BASE}/api/v1/accounts/login/");
        let result = self
            .send(
                self.request(Method::POST, &url).form(&[
                    ("username", credential.username.as_str()),
                    ("enc_password", enc_password.as_str()),
                    ("guid", self.guid.as_str()),
                    ("device_id", self.device_id.as_str()),
                    ("login_attempt_count", "0"),
                ]),
                "mobile login",
            )
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "secondary login failed");
                self.reset();
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "secondary login rejected");
            self.reset();
            return false;
        }

        // The bearer token for all further calls arrives as a header.
        let token = response
            .headers()
            .get("ig-set-authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        match token {
            Some(token) if !token.is_empty() => {
                self.auth_token = Some(token);
                self.username = Some(credential.username.clone());
                true
            }
            _ => {
                warn!("secondary login returned no authorization header");
                self.reset();
                false
            }
        }
    }

    async fn validate(&mut self) -> bool {
        if self.auth_token.is_none() {
            return false;
        }
        let url = format!("{MOBILE_BASE}/api/v1/accounts/current_user/");
        match self.send(self.request(Method::GET, &url), "mobile session check").await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    debug!(%status, "secondary session explicitly denied");
                    false
                } else {
                    true
                }
            }
            Err(e) => {
                debug!(error = %e, "secondary session check inconclusive, assuming valid");
                true
            }
        }
    }

    async fn warm_up(&mut self, username: &str) {
        let url = format!("{MOBILE_BASE}/api/v1/users/search/?q={username}");
        match self.send(self.request(Method::GET, &url), "mobile warm-up").await {
            Ok(_) => info!("secondary session warmed up"),
            Err(e) => warn!(error = %e, "secondary warm-up skipped"),
        }
    }

    async fn fetch_comments(
        &self,
        shortcode: &Shortcode,
        limit: usize,
    ) -> Result<Vec<Comment>, FetchError> {
        if self.auth_token.is_none() {
            return Err(FetchError::AuthRequired(
                "secondary has no active session".to_string(),
            ));
        }
        info!(%shortcode, "scraping via secondary");

        let media_pk = shortcode.media_pk();
        let mut comments = Vec::new();
        let mut max_id: Option<String> = None;

        while comments.len() < limit {
            let mut url =
                format!("{MOBILE_BASE}/api/v1/media/{media_pk}/comments/?can_support_threading=true");
            if let Some(cursor) = &max_id {
                url.push_str("&max_id=");
                url.push_str(cursor);
            }

            let response = self
                .send(self.request(Method::GET, &url), "mobile comments fetch")
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::from_status(status, "mobile comments fetch"));
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| FetchError::Transient(format!("mobile comments body: {e}")))?;

            let page = body["comments"].as_array().cloned().unwrap_or_default();
            if page.is_empty() {
                break;
            }
            for item in &page {
                if comments.len() >= limit {
                    break;
                }
                comments.push(Comment {
                    username: item["user"]["username"].as_str().unwrap_or("").to_string(),
                    text: item["text"].as_str().unwrap_or("").to_string(),
                });
            }

            max_id = body["next_max_id"].as_str().map(str::to_string);
            if max_id.is_none() {
                break;
            }
        }

        debug!(count = comments.len(), "mobile comments fetched");
        Ok(comments)
    }

    fn session_handle(&self) -> Option<SessionHandle> {
        let username = self.username.as_deref()?;
        let token = self.auth_token.clone()?;
        let mut handle = SessionHandle::new(username);
        handle.auth_token = Some(token);
        handle.device_id = Some(self.device_id.clone());
        handle.user_agent = Some(MOBILE_USER_AGENT.to_string());
        Some(handle)
    }
}
