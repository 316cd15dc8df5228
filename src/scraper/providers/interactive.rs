// Interactive provider - real login form driven through headless Chrome
//
// Last-resort backend: expensive and fragile, but it survives challenges
// that defeat the direct API logins. Spawns the configured chromedriver,
// drives the login form over WebDriver, harvests the resulting cookies and
// from then on behaves exactly like a browser-derived session.

use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{ClientBuilder, Locator};
use tokio::process::Child;
use tracing::{debug, info, warn};

use super::web::{WebApiClient, WEB_USER_AGENT};
use crate::scraper::errors::FetchError;
use crate::scraper::models::{Comment, Credential, ProviderKind, SessionHandle, Shortcode};
use crate::scraper::traits::CommentProvider;

const LOGIN_URL: &str = "https://www.instagram.com/accounts/login/";

/// How long the whole form-login attempt may take, driver startup included.
const LOGIN_BUDGET: Duration = Duration::from_secs(120);

pub struct InteractiveProvider {
    web: WebApiClient,
    chromedriver_path: Option<PathBuf>,
    username: Option<String>,
}

impl InteractiveProvider {
    pub fn new(timeout: Duration, chromedriver_path: Option<PathBuf>) -> Self {
        Self {
            web: WebApiClient::new(timeout),
            chromedriver_path,
            username: None,
        }
    }

    /// Reserve a free local port for the driver.
    fn free_port() -> Option<u16> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").ok()?;
        listener.local_addr().ok().map(|a| a.port())
    }

    /// Poll until the driver accepts connections.
    async fn wait_for_port(port: u16) -> bool {
        let addr = format!("127.0.0.1:{port}");
        for _ in 0..40 {
            if let Ok(parsed) = addr.parse() {
                if TcpStream::connect_timeout(&parsed, Duration::from_millis(250)).is_ok() {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        false
    }

    fn spawn_driver(&self, port: u16) -> Result<Child, String> {
        let path = self
            .chromedriver_path
            .as_ref()
            .ok_or_else(|| "no chromedriver configured".to_string())?;
        tokio::process::Command::new(path)
            .arg(format!("--port={port}"))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start chromedriver: {e}"))
    }

    /// Drive the login form and return every cookie the browser ends up
    /// holding. The driver process is reaped on every path.
    async fn webdriver_login(
        &self,
        credential: &Credential,
    ) -> Result<Vec<(String, String)>, String> {
        let port = Self::free_port().ok_or("no free local port")?;
        let mut driver = self.spawn_driver(port)?;
        let result = self.webdriver_login_inner(credential, port).await;
        let _ = driver.kill().await;
        result
    }

    async fn webdriver_login_inner(
        &self,
        credential: &Credential,
        port: u16,
    ) -> Result<Vec<(String, String)>, String> {
        if !Self::wait_for_port(port).await {
            return Err("chromedriver did not come up".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({
                "args": [
                    "--headless=new",
                    "--disable-gpu",
                    "--no-sandbox",
                    "--window-size=1280,900",
                ]
            }),
        );

        let client = ClientBuilder::rustls()
            .map_err(|e| format!("tls setup: {e}"))?
            .capabilities(caps)
            .connect(&format!("http://127.0.0.1:{port}"))
            .await
            .map_err(|e| format!("webdriver connect: {e}"))?;

        let outcome = async {
            client
                .goto(LOGIN_URL)
                .await
                .map_err(|e| format!("goto login page: {e}"))?;

            let user_field = client
                .wait()
                .for_element(Locator::Css("input[name='username']"))
                .await
                .map_err(|e| format!("login form never appeared: {e}"))?;
            user_field
                .send_keys(&credential.username)
                .await
                .map_err(|e| format!("type username: {e}"))?;

            client
                .find(Locator::Css("input[name='password']"))
                .await
                .map_err(|e| format!("password field: {e}"))?
                .send_keys(&credential.password)
                .await
                .map_err(|e| format!("type password: {e}"))?;

            client
                .find(Locator::Css("button[type='submit']"))
                .await
                .map_err(|e| format!("submit button: {e}"))?
                .click()
                .await
                .map_err(|e| format!("submit click: {e}"))?;

            // The session cookie appears once the server accepts the form;
            // poll for it instead of guessing a fixed delay.
            for _ in 0..30 {
                tokio::time::sleep(Duration::from_millis(1000)).await;
                let cookies = client
                    .get_all_cookies()
                    .await
                    .map_err(|e| format!("read cookies: {e}"))?;
                if cookies.iter().any(|c| c.name() == super::web::SESSION_COOKIE) {
                    return Ok(cookies
                        .iter()
                        .map(|c| (c.name().to_string(), c.value().to_string()))
                        .collect());
                }
            }
            Err("no session cookie after form submit".to_string())
        }
        .await;

        let _ = client.close().await;
        outcome
    }
}

#[async_trait]
impl CommentProvider for InteractiveProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Interactive
    }

    fn is_available(&self) -> bool {
        self.chromedriver_path
            .as_ref()
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    async fn load_session(&mut self, handle: &SessionHandle) -> bool {
        self.web.cookies.clear();
        self.web.cookies.load_stored(&handle.cookies);
        if !self.web.has_session_cookie() {
            self.web.cookies.clear();
            return false;
        }
        self.username = Some(handle.username.clone());
        true
    }

    async fn login(&mut self, credential: &Credential) -> bool {
        info!(username = %credential.username, "interactive form login");
        let attempt =
            tokio::time::timeout(LOGIN_BUDGET, self.webdriver_login(credential)).await;
        let cookies = match attempt {
            Ok(Ok(cookies)) => cookies,
            Ok(Err(e)) => {
                warn!(error = %e, "interactive login failed");
                return false;
            }
            Err(_) => {
                warn!("interactive login exceeded its time budget");
                return false;
            }
        };

        self.web.cookies.clear();
        for (name, value) in &cookies {
            self.web.cookies.insert(name, value);
        }
        if !self.web.validate_session().await {
            debug!("harvested cookies rejected by remote");
            self.web.cookies.clear();
            return false;
        }
        self.username = Some(credential.username.clone());
        true
    }

    async fn validate(&mut self) -> bool {
        self.web.validate_session().await
    }

    async fn warm_up(&mut self, username: &str) {
        match self.web.profile_lookup(username).await {
            Ok(()) => info!("interactive session warmed up"),
            Err(e) => warn!(error = %e, "interactive warm-up skipped"),
        }
    }

    async fn fetch_comments(
        &self,
        shortcode: &Shortcode,
        limit: usize,
    ) -> Result<Vec<Comment>, FetchError> {
        info!(%shortcode, "scraping via interactive session");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_without_chromedriver() {
        let provider = InteractiveProvider::new(Duration::from_secs(5), None);
        assert!(!provider.is_available());

        let provider = InteractiveProvider::new(
            Duration::from_secs(5),
            Some(PathBuf::from("/definitely/not/here/chromedriver")),
        );
        assert!(!provider.is_available());
    }

    #[test]
    fn test_free_port_is_bindable() {
        let port = InteractiveProvider::free_port().unwrap();
        assert!(port > 0);
    }
}
