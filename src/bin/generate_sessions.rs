// Session generator - fresh logins for the Primary and Secondary providers
//
// Run this once from a trusted network before deploying: the serving
// process can then start from warm session files instead of risking a
// fresh login on every boot.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use social_pulse::config::Config;
use social_pulse::scraper::models::mask_secret;
use social_pulse::scraper::providers::{PrimaryProvider, SecondaryProvider};
use social_pulse::scraper::session_store::SessionStore;
use social_pulse::scraper::traits::CommentProvider;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("{}", "=".repeat(50));
    println!(" SOCIAL PULSE: SESSION GENERATOR");
    println!("{}", "=".repeat(50));

    let config = Config::from_env();
    let credential = config.credential();
    if !credential.is_complete() {
        error!("credentials missing in .env file");
        return ExitCode::FAILURE;
    }
    info!(
        username = %credential.username,
        password = %mask_secret(&credential.password),
        session_path = %config.session_file.display(),
        "generating sessions"
    );

    let store = SessionStore::new(config.session_file.clone());
    let mut any_success = false;

    let mut primary = PrimaryProvider::new(config.request_timeout);
    any_success |= generate(&store, &mut primary, &credential).await;

    let mut secondary = SecondaryProvider::new(config.request_timeout);
    any_success |= generate(&store, &mut secondary, &credential).await;

    if any_success {
        info!("done - session files are ready");
        ExitCode::SUCCESS
    } else {
        error!("every login failed; no session files written");
        ExitCode::FAILURE
    }
}

async fn generate(
    store: &SessionStore,
    provider: &mut dyn CommentProvider,
    credential: &social_pulse::scraper::Credential,
) -> bool {
    let kind = provider.kind();
    info!(provider = %kind, "attempting fresh login");

    if !provider.login(credential).await {
        error!(provider = %kind, "login failed");
        return false;
    }
    let Some(handle) = provider.session_handle() else {
        error!(provider = %kind, "login produced no persistable session");
        return false;
    };
    match store.save(kind, &handle) {
        Ok(path) => {
            info!(provider = %kind, path = %path.display(), "session saved");
            true
        }
        Err(e) => {
            error!(provider = %kind, error = %e, "could not save session");
            false
        }
    }
}
