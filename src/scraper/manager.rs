// Provider lifecycle state machine
//
// Owns every provider and its Uninitialized/Active/Dead state for the life
// of the process. Initialization walks the priority order and stops at the
// first Active provider; later providers stay Uninitialized until a fetch
// actually needs them, so the expensive fallbacks cost nothing on the happy
// path.

use tracing::{error, info, warn};

use crate::config::Config;
use crate::scraper::errors::FetchError;
use crate::scraper::models::{Credential, ProviderKind, ProviderState};
use crate::scraper::providers::{
    BrowserProvider, InteractiveProvider, PrimaryProvider, SecondaryProvider,
};
use crate::scraper::session_store::SessionStore;
use crate::scraper::traits::CommentProvider;

struct ProviderSlot {
    provider: Box<dyn CommentProvider>,
    state: ProviderState,
}

/// Exclusive owner of provider lifecycle and state transitions.
///
/// The API is sequential (`&mut self`): one fetch drives the chain to
/// completion. Callers that serve concurrent requests wrap the coordinator
/// in their own lock; no state transition here spans a network call made on
/// behalf of another request.
pub struct SessionManager {
    credential: Credential,
    store: SessionStore,
    slots: Vec<ProviderSlot>,
}

impl SessionManager {
    /// Build the manager with the four real providers in priority order.
    ///
    /// Fails fast with a configuration error when credentials are missing;
    /// no network call is attempted in that case.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let credential = config.credential();
        if !credential.is_complete() {
            return Err(FetchError::Configuration(
                "instagram username/password missing".to_string(),
            ));
        }
        let timeout = config.request_timeout;
        let providers: Vec<Box<dyn CommentProvider>> = vec![
            Box::new(PrimaryProvider::new(timeout)),
            Box::new(SecondaryProvider::new(timeout)),
            Box::new(BrowserProvider::new(timeout)),
            Box::new(InteractiveProvider::new(
                timeout,
                config.chromedriver_path.clone(),
            )),
        ];
        Ok(Self::with_providers(
            credential,
            SessionStore::new(config.session_file.clone()),
            providers,
        ))
    }

    /// Assemble a manager from explicit parts. Provider order is priority
    /// order.
    pub fn with_providers(
        credential: Credential,
        store: SessionStore,
        providers: Vec<Box<dyn CommentProvider>>,
    ) -> Self {
        let slots = providers
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                state: ProviderState::Uninitialized,
            })
            .collect();
        Self {
            credential,
            store,
            slots,
        }
    }

    /// Startup policy: strict priority order, short-circuit at the first
    /// provider that reaches Active. Providers after it stay Uninitialized
    /// for just-in-time probing later.
    pub async fn initialize(&mut self) {
        for idx in 0..self.slots.len() {
            if self.activate_slot(idx).await {
                return;
            }
        }
        error!("CRITICAL: every login method failed; fetches will be unavailable");
    }

    /// Try to move one Uninitialized slot to Active: stored session first,
    /// then a fresh login. A fresh login is followed by exactly one warm-up
    /// call and a session save; neither outcome affects the transition.
    async fn activate_slot(&mut self, idx: usize) -> bool {
        let Self {
            credential,
            store,
            slots,
        } = self;
        let slot = &mut slots[idx];
        let kind = slot.provider.kind();

        if !slot.provider.is_available() {
            info!(provider = %kind, "prerequisites missing, skipping");
            slot.state = ProviderState::Dead;
            return false;
        }

        if let Some(handle) = store.load(kind) {
            if slot.provider.load_session(&handle).await && slot.provider.validate().await {
                info!(provider = %kind, "session loaded and verified");
                slot.state = ProviderState::Active;
                return true;
            }
            info!(provider = %kind, "stored session unusable, attempting fresh login");
        }

        if slot.provider.login(credential).await {
            slot.provider.warm_up(&credential.username).await;
            match slot.provider.session_handle() {
                Some(handle) => {
                    if let Err(e) = store.save(kind, &handle) {
                        error!(provider = %kind, error = %e, "could not persist session");
                    }
                }
                None => warn!(provider = %kind, "login yielded no persistable session"),
            }
            info!(provider = %kind, "login successful");
            slot.state = ProviderState::Active;
            return true;
        }

        warn!(provider = %kind, "login failed, marking dead");
        slot.state = ProviderState::Dead;
        false
    }

    /// Index of the highest-priority Active provider, probing Uninitialized
    /// slots just in time. Never returns a Dead provider; None means every
    /// provider is Dead.
    pub async fn best_provider(&mut self) -> Option<usize> {
        for idx in 0..self.slots.len() {
            match self.slots[idx].state {
                ProviderState::Active => return Some(idx),
                ProviderState::Dead => continue,
                ProviderState::Uninitialized => {
                    if self.activate_slot(idx).await {
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    pub fn provider(&self, idx: usize) -> &dyn CommentProvider {
        self.slots[idx].provider.as_ref()
    }

    pub fn kind_at(&self, idx: usize) -> ProviderKind {
        self.slots[idx].provider.kind()
    }

    /// Record an unrecoverable failure. Dead is terminal for this manager
    /// instance.
    pub fn mark_dead(&mut self, idx: usize) {
        let kind = self.slots[idx].provider.kind();
        warn!(provider = %kind, "marked dead");
        self.slots[idx].state = ProviderState::Dead;
    }

    pub fn state_of(&self, kind: ProviderKind) -> Option<ProviderState> {
        self.slots
            .iter()
            .find(|s| s.provider.kind() == kind)
            .map(|s| s.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::test_support::{test_credential, StubProvider};

    fn temp_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("primary_session.json"));
        (dir, store)
    }

    fn manager_of(providers: Vec<Box<dyn CommentProvider>>) -> (tempfile::TempDir, SessionManager) {
        let (dir, store) = temp_store();
        (
            dir,
            SessionManager::with_providers(test_credential(), store, providers),
        )
    }

    #[test]
    fn test_new_fails_fast_without_credentials() {
        let config = Config::default();
        assert!(matches!(
            SessionManager::new(&config),
            Err(FetchError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_short_circuits_at_first_active() {
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(true);
        let secondary = StubProvider::new(ProviderKind::Secondary);
        let secondary_log = secondary.call_log();

        let (_dir, mut manager) = manager_of(vec![Box::new(primary), Box::new(secondary)]);
        manager.initialize().await;

        assert_eq!(
            manager.state_of(ProviderKind::Primary),
            Some(ProviderState::Active)
        );
        // Never touched: stays Uninitialized for lazy probing.
        assert_eq!(
            manager.state_of(ProviderKind::Secondary),
            Some(ProviderState::Uninitialized)
        );
        assert!(secondary_log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_advances_past_failed_login() {
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(false);
        let secondary = StubProvider::new(ProviderKind::Secondary).logs_in(true);

        let (_dir, mut manager) = manager_of(vec![Box::new(primary), Box::new(secondary)]);
        manager.initialize().await;

        assert_eq!(
            manager.state_of(ProviderKind::Primary),
            Some(ProviderState::Dead)
        );
        assert_eq!(
            manager.state_of(ProviderKind::Secondary),
            Some(ProviderState::Active)
        );
    }

    #[tokio::test]
    async fn test_unavailable_provider_goes_dead_without_calls() {
        let primary = StubProvider::new(ProviderKind::Primary)
            .available(false)
            .logs_in(true);
        let primary_log = primary.call_log();
        let secondary = StubProvider::new(ProviderKind::Secondary).logs_in(true);

        let (_dir, mut manager) = manager_of(vec![Box::new(primary), Box::new(secondary)]);
        manager.initialize().await;

        assert_eq!(
            manager.state_of(ProviderKind::Primary),
            Some(ProviderState::Dead)
        );
        assert!(primary_log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_warm_up_after_fresh_login_only() {
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(true);
        let log = primary.call_log();

        let (_dir, mut manager) = manager_of(vec![Box::new(primary)]);
        manager.initialize().await;

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls, vec!["login", "warm_up"]);
    }

    #[tokio::test]
    async fn test_no_warm_up_after_loaded_session() {
        let (dir, store) = temp_store();
        store
            .save(
                ProviderKind::Primary,
                &crate::scraper::models::SessionHandle::new("operator"),
            )
            .unwrap();

        let primary = StubProvider::new(ProviderKind::Primary)
            .loads(true)
            .validates(true);
        let log = primary.call_log();

        let mut manager =
            SessionManager::with_providers(test_credential(), store, vec![Box::new(primary)]);
        manager.initialize().await;
        drop(dir);

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls, vec!["load_session", "validate"]);
        assert_eq!(
            manager.state_of(ProviderKind::Primary),
            Some(ProviderState::Active)
        );
    }

    #[tokio::test]
    async fn test_stale_session_falls_back_to_login() {
        let (dir, store) = temp_store();
        store
            .save(
                ProviderKind::Primary,
                &crate::scraper::models::SessionHandle::new("operator"),
            )
            .unwrap();

        let primary = StubProvider::new(ProviderKind::Primary)
            .loads(true)
            .validates(false)
            .logs_in(true);
        let log = primary.call_log();

        let mut manager =
            SessionManager::with_providers(test_credential(), store, vec![Box::new(primary)]);
        manager.initialize().await;
        drop(dir);

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls, vec!["load_session", "validate", "login", "warm_up"]);
    }

    #[tokio::test]
    async fn test_login_persists_session_file() {
        let (dir, store) = temp_store();
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(true);

        let mut manager =
            SessionManager::with_providers(test_credential(), store.clone(), vec![Box::new(primary)]);
        manager.initialize().await;

        assert!(store.load(ProviderKind::Primary).is_some());
        drop(dir);
    }

    #[tokio::test]
    async fn test_best_provider_never_returns_dead() {
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(true);
        let (_dir, mut manager) = manager_of(vec![Box::new(primary)]);
        manager.initialize().await;

        let idx = manager.best_provider().await.unwrap();
        manager.mark_dead(idx);

        assert!(manager.best_provider().await.is_none());
        assert_eq!(
            manager.state_of(ProviderKind::Primary),
            Some(ProviderState::Dead)
        );
    }

    #[tokio::test]
    async fn test_best_provider_lazily_probes_next() {
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(true);
        let secondary = StubProvider::new(ProviderKind::Secondary).logs_in(true);
        let secondary_log = secondary.call_log();

        let (_dir, mut manager) = manager_of(vec![Box::new(primary), Box::new(secondary)]);
        manager.initialize().await;

        let idx = manager.best_provider().await.unwrap();
        assert_eq!(manager.kind_at(idx), ProviderKind::Primary);
        assert!(secondary_log.lock().unwrap().is_empty());

        manager.mark_dead(idx);
        let idx = manager.best_provider().await.unwrap();
        assert_eq!(manager.kind_at(idx), ProviderKind::Secondary);
        assert!(!secondary_log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dead_is_terminal_within_instance() {
        // Would log in fine if asked again - but Dead providers are never
        // re-asked by the same manager.
        let primary = StubProvider::new(ProviderKind::Primary).logs_in(true);
        let log = primary.call_log();

        let (_dir, mut manager) = manager_of(vec![Box::new(primary)]);
        manager.initialize().await;
        manager.mark_dead(0);

        assert!(manager.best_provider().await.is_none());
        assert!(manager.best_provider().await.is_none());

        let login_calls = log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == "login")
            .count();
        assert_eq!(login_calls, 1);
    }
}
