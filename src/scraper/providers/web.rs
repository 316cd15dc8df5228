// Shared client for the web (www.) API surface
//
// Primary, Browser, and Interactive all end up holding browser-style
// cookies, so they share one client. Cookies are tracked by hand in a
// CookieMap instead of the reqwest jar: a serializable jar is what lets a
// session round-trip through the SessionStore.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, USER_AGENT};
use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::scraper::errors::FetchError;
use crate::scraper::models::{unix_now, Comment, CookieMap};

pub const WEB_BASE: &str = "https://www.instagram.com";

/// Desktop browser identity for the web surface.
pub const WEB_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// App id the web client sends on every API call.
const WEB_APP_ID: &str = "936619743392459";

/// Session cookie that must exist for the client to be worth validating.
pub const SESSION_COOKIE: &str = "sessionid";

pub struct WebApiClient {
    http: reqwest::Client,
    pub cookies: CookieMap,
}

impl WebApiClient {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            cookies: CookieMap::new(),
        }
    }

    /// Whether a session cookie is present at all.
    pub fn has_session_cookie(&self) -> bool {
        self.cookies.get(SESSION_COOKIE).is_some()
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(WEB_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static(WEB_BASE));
        headers.insert("X-IG-App-ID", HeaderValue::from_static(WEB_APP_ID));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if let Some(cookie_header) = self.cookies.header() {
            if let Ok(value) = HeaderValue::from_str(&cookie_header) {
                headers.insert(COOKIE, value);
            }
        }
        if let Some(csrf) = self.cookies.get("csrftoken") {
            if let Ok(value) = HeaderValue::from_str(csrf) {
                headers.insert("X-CSRFToken", value);
            }
        }
        self.http.request(method, url).headers(headers)
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> Result<reqwest::Response, FetchError> {
        builder
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, context))
    }

    /// Fetch the landing page once to obtain a csrf token cookie, required
    /// before the login form POST is accepted.
    pub async fn prime_csrf(&mut self) -> Result<(), FetchError> {
        let response = self
            .send(self.request(Method::GET, WEB_BASE), "csrf priming")
            .await?;
        self.cookies.absorb(response.headers());
        if self.cookies.get("csrftoken").is_none() {
            return Err(FetchError::Transient(
                "csrf priming yielded no token".to_string(),
            ));
        }
        Ok(())
    }

    /// Password login through the web form endpoint.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool, FetchError> {
        if self.cookies.get("csrftoken").is_none() {
            self.prime_csrf().await?;
        }

        let enc_password = format!("#PWD_INSTAGRAM_BROWSER:0:{}:{}", unix_now(), password);
        let url = format!("{WEB_BASE}/api/v1/web/accounts/login/ajax/");
        let response = self
            .send(
                self.request(Method::POST, &url).form(&[
                    ("username", username),
                    ("enc_password", &enc_password),
                    ("optIntoOneTap", "false"),
                ]),
                "web login",
            )
            .await?;

        let status = response.status();
        self.cookies.absorb(response.headers());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(FetchError::from_status(status, "web login"));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(format!("web login body: {e}")))?;
        let authenticated = body["authenticated"].as_bool().unwrap_or(false);
        if authenticated && !self.has_session_cookie() {
            warn!("login reported success but no session cookie arrived");
            return Ok(false);
        }
        Ok(authenticated)
    }

    /// Round trip against an authenticated endpoint to confirm the session
    /// is actually accepted, not just that cookies exist. Explicit denial is
    /// the only failing outcome; uncertainty counts as valid.
    pub async fn validate_session(&mut self) -> bool {
        if !self.has_session_cookie() {
            return false;
        }
        let url = format!("{WEB_BASE}/api/v1/accounts/current_user/");
        match self.send(self.request(Method::GET, &url), "session check").await {
            Ok(response) => {
                let status = response.status();
                self.cookies.absorb(response.headers());
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    debug!(%status, "session explicitly denied");
                    false
                } else {
                    true
                }
            }
            Err(e) => {
                debug!(error = %e, "session check inconclusive, assuming valid");
                true
            }
        }
    }

    /// Single low-risk profile read used for warm-up.
    pub async fn profile_lookup(&self, username: &str) -> Result<(), FetchError> {
        let url = format!("{WEB_BASE}/api/v1/users/web_profile_info/?username={username}");
        let response = self.send(self.request(Method::GET, &url), "profile lookup").await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::from_status(status, "profile lookup"))
        }
    }

    /// Fetch up to `limit` comments for a media id, following the cursor
    /// until the cap or the last page. Remote order is preserved.
    pub async fn fetch_comments(&self, media_pk: u128, limit: usize) -> Result<Vec<Comment>, FetchError> {
        let mut comments = Vec::new();
        let mut min_id: Option<String> = None;

        while comments.len() < limit {
            let mut url = format!(
                "{WEB_BASE}/api/v1/media/{media_pk}/comments/?can_support_threading=true&permalink_enabled=false"
            );
            if let Some(cursor) = &min_id {
                url.push_str("&min_id=");
                url.push_str(cursor);
            }

            let response = self.send(self.request(Method::GET, &url), "comments fetch").await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::from_status(status, "comments fetch"));
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| FetchError::Transient(format!("comments body: {e}")))?;

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

            min_id = body["next_min_id"].as_str().map(str::to_string);
            if min_id.is_none() {
                break;
            }
        }

        debug!(count = comments.len(), "web comments fetched");
        Ok(comments)
    }
}
