use std::sync::Arc;

use reelshelf::{AppState, app, config::Config, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelshelf=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = wreq::Client::builder().build()?;

    let db = db::connect_and_migrate(config.database_url.as_str()).await?;

    let state = Arc::new(AppState::new(config.clone(), db, http));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, upstream = %config.movies_api_url, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
