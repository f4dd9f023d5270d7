use foodgram::{init_db, make_router, run_app, AppConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    let pool = match init_db(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(media_root = %config.media_root.display(), "configuration loaded");

    let router = make_router();
    if let Err(e) = run_app(router, pool, config).await {
        error!("Server error: {:#}", e);
    }
}
