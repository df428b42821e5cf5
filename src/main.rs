use std::sync::Arc;

use actix_web::{middleware::Logger, App, HttpServer};
use tracing_subscriber::EnvFilter;

use spendwise::auth::TokenKeys;
use spendwise::config::AppConfig;
use spendwise::db::{MemoryStore, PgStore};
use spendwise::AppState;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("invalid configuration: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");

    let keys = TokenKeys::from_config(&config);

    let state = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            AppState::new(Arc::new(store), keys)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using the in-memory store");
            let store = MemoryStore::default();
            if let Some((username, password)) = &config.dev_user {
                let email = format!("{username}@localhost");
                store
                    .add_user(username, &email, password, bcrypt::DEFAULT_COST)
                    .await?;
                tracing::info!(%username, "seeded development user");
            }
            AppState::new(Arc::new(store), keys)
        }
    };

    let addr = config.bind_addr();
    tracing::info!("Listening on: {}", addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
