// Scripted provider double shared by the manager and coordinator tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::scraper::errors::FetchError;
use crate::scraper::models::{Comment, Credential, ProviderKind, SessionHandle, Shortcode};
use crate::scraper::traits::CommentProvider;

/// Call log and fetch script are behind Arcs so a test keeps its handles
/// after the provider is boxed into the manager.
pub struct StubProvider {
    kind: ProviderKind,
    available: bool,
    load_ok: bool,
    login_ok: bool,
    validate_ok: bool,
    fetch_script: Arc<Mutex<VecDeque<Result<Vec<Comment>, FetchError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            available: true,
            load_ok: false,
            login_ok: true,
            validate_ok: true,
            fetch_script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn available(mut self, yes: bool) -> Self {
        self.available = yes;
        self
    }

    pub fn loads(mut self, yes: bool) -> Self {
        self.load_ok = yes;
        self
    }

    pub fn logs_in(mut self, yes: bool) -> Self {
        self.login_ok = yes;
        self
    }

    pub fn validates(mut self, yes: bool) -> Self {
        self.validate_ok = yes;
        self
    }

    /// Queue the outcome of the next fetch_comments call.
    pub fn push_fetch(&self, result: Result<Vec<Comment>, FetchError>) {
        self.fetch_script.lock().unwrap().push_back(result);
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl CommentProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn load_session(&mut self, _handle: &SessionHandle) -> bool {
        self.record("load_session");
        self.load_ok
    }

    async fn login(&mut self, _credential: &Credential) -> bool {
        self.record("login");
        self.login_ok
    }

    async fn validate(&mut self) -> bool {
        self.record("validate");
        self.validate_ok
    }

    async fn warm_up(&mut self, _username: &str) {
        self.record("warm_up");
    }

    async fn fetch_comments(
        &self,
        _shortcode: &Shortcode,
        _limit: usize,
    ) -> Result<Vec<Comment>, FetchError> {
        // Deliberately ignores the limit: coordinator-side truncation is
        // part of what the tests exercise.
        self.record("fetch");
        match self.fetch_script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }

    fn session_handle(&self) -> Option<SessionHandle> {
        Some(SessionHandle::new("stub-operator"))
    }
}

/// `count` comments named c0..cN, in order.
pub fn make_comments(count: usize) -> Vec<Comment> {
    (0..count)
        .map(|i| Comment {
            username: format!("user{i}"),
            text: format!("c{i}"),
        })
        .collect()
}

pub fn test_credential() -> Credential {
    Credential::new("operator", "hunter22")
}
