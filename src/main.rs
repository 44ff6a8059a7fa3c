use dotenvy::dotenv;
use log::{error, warn};
use std::sync::Arc;

use viberdesk::channels::viber::ViberClient;
use viberdesk::config::AppConfig;
use viberdesk::handoff::store::PgHandoffStore;
use viberdesk::shared::state::AppState;
use viberdesk::shared::utils::{create_conn, run_migrations};
use viberdesk::web_server;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("configuration error: {e}"),
            ));
        }
    };

    let pool = match create_conn(&config.database_url()) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("Database pool creation failed: {}", e),
            ));
        }
    };

    if let Err(e) = run_migrations(&pool) {
        error!("Failed to run migrations: {}", e);
        return Err(std::io::Error::other(format!("Migration failed: {e}")));
    }

    let viber = Arc::new(ViberClient::new(&config.viber));
    if !config.viber.webhook_url.is_empty() {
        let client = viber.clone();
        let webhook_url = config.viber.webhook_url.clone();
        tokio::spawn(async move {
            if let Err(e) = client.set_webhook(&webhook_url).await {
                warn!("failed to register viber webhook: {e}");
            }
        });
    } else {
        warn!("VIBER_WEBHOOK_URL not set, skipping webhook registration");
    }

    let handoff = Arc::new(PgHandoffStore::new(pool.clone()));
    let state = Arc::new(AppState {
        conn: pool,
        config,
        viber,
        handoff,
    });

    web_server::run(state).await
}
