// Browser-derived provider - cookies lifted from locally installed browsers
//
// Walks the operator's Mozilla-family browsers in a fixed priority order and
// adopts the first domain-matching cookie set that actually passes
// validation. Chromium-family stores are encrypted at rest and are not
// walked. The derived session is handed to the SessionStore afterwards so
// future processes skip this path entirely.
//
// Everything here is environment-coupled: a headless CI box with no browser
// profiles simply reports unavailable, which the manager treats as a normal
// Dead transition.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, Row};
use tracing::{debug, info, warn};

use super::web::{WebApiClient, SESSION_COOKIE, WEB_USER_AGENT};
use crate::scraper::errors::FetchError;
use crate::scraper::models::{Comment, Credential, ProviderKind, SessionHandle, Shortcode};
use crate::scraper::traits::CommentProvider;

/// Browsers tried for cookie extraction, in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Firefox,
    Librewolf,
    Waterfox,
}

impl BrowserKind {
    pub const PRIORITY: [BrowserKind; 3] = [
        BrowserKind::Firefox,
        BrowserKind::Librewolf,
        BrowserKind::Waterfox,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Librewolf => "librewolf",
            Self::Waterfox => "waterfox",
        }
    }

    /// Directories that may hold this browser's profiles on the current
    /// platform. Missing directories are skipped silently.
    fn profile_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(home) = dirs::home_dir() {
            match self {
                Self::Firefox => {
                    roots.push(home.join(".mozilla/firefox"));
                    roots.push(home.join("Library/Application Support/Firefox/Profiles"));
                }
                Self::Librewolf => {
                    roots.push(home.join(".librewolf"));
                    roots.push(home.join("Library/Application Support/LibreWolf/Profiles"));
                }
                Self::Waterfox => {
                    roots.push(home.join(".waterfox"));
                    roots.push(home.join("Library/Application Support/Waterfox/Profiles"));
                }
            }
        }
        if let Some(data) = dirs::data_dir() {
            match self {
                Self::Firefox => roots.push(data.join("Mozilla/Firefox/Profiles")),
                Self::Librewolf => roots.push(data.join("librewolf/Profiles")),
                Self::Waterfox => roots.push(data.join("Waterfox/Profiles")),
            }
        }
        roots
    }

    /// Paths of every cookies.sqlite under this browser's profile roots,
    /// sorted for deterministic probing order.
    fn cookie_databases(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in self.profile_roots() {
            let Ok(entries) = std::fs::read_dir(&root) else { continue };
            for entry in entries.flatten() {
                let db = entry.path().join("cookies.sqlite");
                if db.is_file() {
                    found.push(db);
                }
            }
        }
        found.sort();
        found
    }
}

pub struct BrowserProvider {
    web: WebApiClient,
    username: Option<String>,
    source: Option<BrowserKind>,
}

impl BrowserProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            web: WebApiClient::new(timeout),
            username: None,
            source: None,
        }
    }

    /// Read the domain-matching cookies out of one profile database.
    ///
    /// The live database is locked while the browser runs, so a throwaway
    /// copy is queried instead.
    async fn read_cookie_db(db: &Path) -> Option<Vec<(String, String)>> {
        let scratch = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "could not create scratch file for cookie db");
                return None;
            }
        };
        if let Err(e) = std::fs::copy(db, scratch.path()) {
            debug!(db = %db.display(), error = %e, "cookie db not copyable");
            return None;
        }

        let result = async {
            let mut conn = SqliteConnectOptions::new()
                .filename(scratch.path())
                .read_only(true)
                .connect()
                .await?;
            let rows = sqlx::query(
                "SELECT name, value FROM moz_cookies WHERE host LIKE '%instagram.com'",
            )
            .fetch_all(&mut conn)
            .await?;
            let mut cookies = Vec::with_capacity(rows.len());
            for row in rows {
                let name: String = row.try_get(0)?;
                let value: String = row.try_get(1)?;
                cookies.push((name, value));
            }
            conn.close().await.ok();
            Ok::<_, sqlx::Error>(cookies)
        }
        .await;

        match result {
            Ok(cookies) => Some(cookies),
            Err(e) => {
                debug!(db = %db.display(), error = %e, "cookie db query failed");
                None
            }
        }
    }

    /// Stage one browser's cookies and check they are actually accepted.
    async fn try_browser(&mut self, browser: BrowserKind) -> bool {
        for db in browser.cookie_databases() {
            let Some(cookies) = Self::read_cookie_db(&db).await else {
                continue;
            };
            let has_session = cookies.iter().any(|(name, _)| name == SESSION_COOKIE);
            if !has_session {
                debug!(browser = browser.as_str(), db = %db.display(), "no session cookie in profile");
                continue;
            }

            self.web.cookies.clear();
            for (name, value) in &cookies {
                self.web.cookies.insert(name, value);
            }
            if self.web.validate_session().await {
                info!(browser = browser.as_str(), db = %db.display(), "adopted browser session");
                self.source = Some(browser);
                return true;
            }
            debug!(browser = browser.as_str(), "browser cookies rejected by remote");
            self.web.cookies.clear();
        }
        false
    }
}

#[async_trait]
impl CommentProvider for BrowserProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Browser
    }

    fn is_available(&self) -> bool {
        BrowserKind::PRIORITY
            .iter()
            .any(|b| b.profile_roots().iter().any(|r| r.is_dir()))
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

    /// "Login" for this provider is cookie derivation; the password is
    /// never used.
    async fn login(&mut self, credential: &Credential) -> bool {
        for browser in BrowserKind::PRIORITY {
            info!(browser = browser.as_str(), "probing browser cookies");
            if self.try_browser(browser).await {
                self.username = Some(credential.username.clone());
                return true;
            }
        }
        self.web.cookies.clear();
        self.username = None;
        false
    }

    async fn validate(&mut self) -> bool {
        self.web.validate_session().await
    }

    async fn warm_up(&mut self, username: &str) {
        match self.web.profile_lookup(username).await {
            Ok(()) => info!("browser-derived session warmed up"),
            Err(e) => warn!(error = %e, "browser-derived warm-up skipped"),
        }
    }

    async fn fetch_comments(
        &self,
        shortcode: &Shortcode,
        limit: usize,
    ) -> Result<Vec<Comment>, FetchError> {
        let source = self.source.map(|b| b.as_str()).unwrap_or("persisted");
        info!(%shortcode, source, "scraping via browser-derived session");
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
    fn test_browser_priority_is_fixed() {
        assert_eq!(
            BrowserKind::PRIORITY,
            [
                BrowserKind::Firefox,
                BrowserKind::Librewolf,
                BrowserKind::Waterfox
            ]
        );
    }

    #[test]
    fn test_cookie_databases_empty_without_profiles() {
        // Roots that don't exist on the test machine must be skipped, not
        // error out.
        for browser in BrowserKind::PRIORITY {
            let _ = browser.cookie_databases();
        }
    }

    #[tokio::test]
    async fn test_read_cookie_db_missing_file() {
        let missing = Path::new("/nonexistent/cookies.sqlite");
        assert!(BrowserProvider::read_cookie_db(missing).await.is_none());
    }
}
