use std::sync::Arc;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

use xobikey::config::Config;
use xobikey::db::{self, AppState};
use xobikey::handlers;
use xobikey::middleware::SharedSecretAuthorizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let admin_secret = match config.admin_secret.clone() {
        Some(secret) => secret,
        // Dev convenience only; production refuses to start without a secret.
        None if config.dev_mode => {
            let secret = uuid::Uuid::new_v4().to_string();
            tracing::warn!("ADMIN_SECRET not set; generated dev secret: {}", secret);
            secret
        }
        None => bail!("ADMIN_SECRET must be set"),
    };

    let pool = db::create_pool(&config.database_path)?;
    {
        let conn = pool.get()?;
        db::init_schema(&conn)?;
    }
    tracing::info!("database ready at {}", config.database_path);

    let state = AppState {
        db: pool,
        admin_auth: Arc::new(SharedSecretAuthorizer::new(admin_secret)),
        generate_cap: config.generate_cap,
    };

    let app = handlers::app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("xobikey listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
