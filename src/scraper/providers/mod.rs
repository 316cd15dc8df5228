// Provider adapters, in descending priority order

pub mod web;

pub mod primary;
pub mod secondary;
pub mod browser;
pub mod interactive;

pub use primary::PrimaryProvider;
pub use secondary::SecondaryProvider;
pub use browser::BrowserProvider;
pub use interactive::InteractiveProvider;
