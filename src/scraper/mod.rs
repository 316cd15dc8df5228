// Scraping core - hybrid session management and comment-fetch failover

pub mod errors;
pub mod models;
pub mod session_store;
pub mod traits;
pub mod providers;
pub mod manager;
pub mod coordinator;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::FetchCoordinator;
pub use errors::FetchError;
pub use manager::SessionManager;
pub use models::{Comment, Credential, ProviderKind, ProviderState, SessionHandle, Shortcode};
pub use session_store::SessionStore;
pub use traits::CommentProvider;
