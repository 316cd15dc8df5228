// social-pulse core: hybrid-session comment scraping with sentiment tagging
//
// The web layer is a thin consumer of two things exported here: the
// FetchCoordinator (the sole scraping entry point) and the pure classify()
// function it applies per comment.

pub mod config;
pub mod scraper;
pub mod sentiment;

pub use config::Config;
pub use scraper::{Comment, CommentProvider, FetchCoordinator, FetchError, SessionManager};
pub use sentiment::{classify, Sentiment};
