// Common data models for the scraping core

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scraper::errors::FetchError;

/// Operator account credential.
///
/// Values are trimmed and stripped of accidental wrapping quotes on
/// construction (.env files frequently arrive as `PASS="'secret'"`).
/// Never persisted in plaintext by the core.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: clean_credential(username),
            password: clean_credential(password),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

// Password must never reach the logs; mask it the way the session
// generator prints it.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &mask_secret(&self.password))
            .finish()
    }
}

/// Strip whitespace and repeated layers of wrapping quotes.
pub fn clean_credential(value: &str) -> String {
    let mut cleaned = value.trim();
    while (cleaned.starts_with('"') && cleaned.ends_with('"') && cleaned.len() >= 2)
        || (cleaned.starts_with('\'') && cleaned.ends_with('\'') && cleaned.len() >= 2)
    {
        cleaned = &cleaned[1..cleaned.len() - 1];
    }
    cleaned.trim().to_string()
}

/// Mask a secret for log output, keeping only the first and last character.
pub fn mask_secret(secret: &str) -> String {
    if secret.len() > 2 {
        let chars: Vec<char> = secret.chars().collect();
        format!(
            "{}{}{}",
            chars[0],
            "*".repeat(chars.len() - 2),
            chars[chars.len() - 1]
        )
    } else {
        "***".to_string()
    }
}

/// One scraped comment, in the order the remote service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub username: String,
    #[serde(alias = "comment")]
    pub text: String,
}

lazy_static! {
    static ref SHORTCODE_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,28}$").expect("valid regex");
}

const SHORTCODE_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Validated post short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcode(String);

impl Shortcode {
    /// Validate a raw short code. A malformed code can never name an
    /// existing post, so rejection is reported as NotFound.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let trimmed = raw.trim();
        if SHORTCODE_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(FetchError::NotFound(format!(
                "malformed shortcode: {trimmed:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric media id encoded by the short code.
    ///
    /// Standard URL-safe base64 positional decoding. Codes longer than 11
    /// characters carry extra addressing data after the media id, so only
    /// the leading 11 characters participate.
    pub fn media_pk(&self) -> u128 {
        self.0
            .chars()
            .take(11)
            .fold(0u128, |pk, c| {
                let idx = SHORTCODE_ALPHABET
                    .find(c)
                    .expect("validated alphabet") as u128;
                pk * 64 + idx
            })
    }
}

impl fmt::Display for Shortcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four authentication backends, in descending priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    Primary,
    Secondary,
    Browser,
    Interactive,
}

impl ProviderKind {
    /// Declared priority order 1 -> 4. Failover walks this order and
    /// nothing else; it models cost and reliability.
    pub const PRIORITY: [ProviderKind; 4] = [
        ProviderKind::Primary,
        ProviderKind::Secondary,
        ProviderKind::Browser,
        ProviderKind::Interactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Browser => "browser",
            Self::Interactive => "interactive",
        }
    }

    /// Token used in session filenames derived from the primary path.
    pub fn file_token(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of one provider within a manager instance.
///
/// Uninitialized -> Active on successful login/load.
/// Uninitialized | Active -> Dead on an unrecoverable auth failure.
/// Dead is terminal for the lifetime of the manager; a fresh process may
/// retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Active,
    Dead,
}

/// One cookie worth persisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Serialized authentication state for one provider.
///
/// Opaque to everything except the owning provider; identified on disk by
/// the path the SessionStore derives for the provider. A handle is never
/// assumed valid without a validate() round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    pub username: String,
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub created_at: u64,
}

impl SessionHandle {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            cookies: Vec::new(),
            auth_token: None,
            device_id: None,
            user_agent: None,
            created_at: unix_now(),
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// In-memory cookie jar with deterministic ordering.
///
/// Cookies are tracked by hand rather than through the HTTP client's jar so
/// that a session can be serialized into a SessionHandle and rebuilt from
/// one.
#[derive(Debug, Clone, Default)]
pub struct CookieMap {
    cookies: BTreeMap<String, String>,
}

impl CookieMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Absorb every Set-Cookie header from a response.
    pub fn absorb(&mut self, headers: &reqwest::header::HeaderMap) {
        for raw in headers.get_all(reqwest::header::SET_COOKIE) {
            let Ok(raw) = raw.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            if let Some((name, value)) = pair.split_once('=') {
                self.insert(name.trim(), value.trim());
            }
        }
    }

    /// Render the Cookie request header, or None when empty.
    pub fn header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn to_stored(&self, domain: &str) -> Vec<StoredCookie> {
        self.cookies
            .iter()
            .map(|(name, value)| StoredCookie {
                name: name.clone(),
                value: value.clone(),
                domain: domain.to_string(),
            })
            .collect()
    }

    pub fn load_stored(&mut self, cookies: &[StoredCookie]) {
        for c in cookies {
            self.insert(&c.name, &c.value);
        }
    }
}
