// On-disk persistence for per-provider session blobs
//
// One primary session file at the configured path; every other provider gets
// a deterministic sibling path so two providers can never clobber each
// other's state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::scraper::models::{ProviderKind, SessionHandle};

#[derive(Debug, Clone)]
pub struct SessionStore {
    primary_path: PathBuf,
}

impl SessionStore {
    pub fn new(primary_path: impl Into<PathBuf>) -> Self {
        Self {
            primary_path: primary_path.into(),
        }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary_path
    }

    /// Derive the session file path for a provider from the primary path.
    ///
    /// The primary provider keeps the configured path. For any other
    /// provider, the primary token in the file stem is replaced by that
    /// provider's token; when the stem carries no token, `_{token}` is
    /// appended instead. A `.json` extension is ensured either way, so
    /// `SessionFiles/primary_session` maps to
    /// `SessionFiles/secondary_session.json` and `SessionFiles/session`
    /// maps to `SessionFiles/session_secondary.json`.
    pub fn derive_path(&self, kind: ProviderKind) -> PathBuf {
        if kind == ProviderKind::Primary {
            return self.primary_path.clone();
        }

        let stem = self
            .primary_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("session");

        let primary_token = ProviderKind::Primary.file_token();
        let mut name = if stem.contains(primary_token) {
            stem.replace(primary_token, kind.file_token())
        } else {
            format!("{stem}_{}", kind.file_token())
        };
        name.push_str(".json");

        match self.primary_path.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Persist a handle, creating parent directories as needed. Errors are
    /// the caller's to handle; this layer never swallows a failed write.
    pub fn save(&self, kind: ProviderKind, handle: &SessionHandle) -> io::Result<PathBuf> {
        let path = self.derive_path(kind);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(handle)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&path, json)?;
        debug!(provider = %kind, path = %path.display(), "session saved");
        Ok(path)
    }

    /// Load a previously persisted handle.
    ///
    /// A missing file is a normal absent session. A corrupt or unreadable
    /// file is logged and treated as absent so the caller re-authenticates
    /// instead of crashing.
    pub fn load(&self, kind: ProviderKind) -> Option<SessionHandle> {
        let path = self.derive_path(kind);
        if !path.exists() {
            debug!(provider = %kind, path = %path.display(), "no session file");
            return None;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(provider = %kind, path = %path.display(), error = %e, "unreadable session file, will re-authenticate");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(handle) => {
                debug!(provider = %kind, path = %path.display(), "session loaded");
                Some(handle)
            }
            Err(e) => {
                warn!(provider = %kind, path = %path.display(), error = %e, "corrupt session file, will re-authenticate");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::models::StoredCookie;

    fn make_handle(username: &str) -> SessionHandle {
        let mut handle = SessionHandle::new(username);
        handle.cookies.push(StoredCookie {
            name: "sessionid".to_string(),
            value: "abc".to_string(),
            domain: ".instagram.com".to_string(),
        });
        handle
    }

    #[test]
    fn test_derive_path_replaces_primary_token() {
        let store = SessionStore::new("SessionFiles/primary_session.json");
        assert_eq!(
            store.derive_path(ProviderKind::Secondary),
            PathBuf::from("SessionFiles/secondary_session.json")
        );
        assert_eq!(
            store.derive_path(ProviderKind::Primary),
            PathBuf::from("SessionFiles/primary_session.json")
        );
    }

    #[test]
    fn test_derive_path_appends_token_when_absent() {
        let store = SessionStore::new("SessionFiles/session");
        assert_eq!(
            store.derive_path(ProviderKind::Browser),
            PathBuf::from("SessionFiles/session_browser.json")
        );
    }

    #[test]
    fn test_derive_path_never_collides_across_kinds() {
        for primary in ["SessionFiles/primary_session", "s/sess.json", "bare"] {
            let store = SessionStore::new(primary);
            let paths: Vec<PathBuf> = ProviderKind::PRIORITY
                .iter()
                .map(|k| store.derive_path(*k))
                .collect();
            for i in 0..paths.len() {
                for j in (i + 1)..paths.len() {
                    assert_ne!(paths[i], paths[j], "collision for primary {primary}");
                }
            }
        }
    }

    #[test]
    fn test_save_creates_directories_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/deeper/primary_session.json"));

        let saved_path = store
            .save(ProviderKind::Secondary, &make_handle("operator"))
            .unwrap();
        assert!(saved_path.exists());

        let loaded = store.load(ProviderKind::Secondary).unwrap();
        assert_eq!(loaded.username, "operator");
        assert_eq!(loaded.cookies.len(), 1);
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("primary_session.json"));
        assert!(store.load(ProviderKind::Primary).is_none());
    }

    #[test]
    fn test_load_corrupt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primary_session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SessionStore::new(&path);
        assert!(store.load(ProviderKind::Primary).is_none());
    }
}
