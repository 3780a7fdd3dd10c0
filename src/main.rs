use tracing_subscriber::EnvFilter;

use semaphore::api::{build_router, ApiContext};
use semaphore::config::{self, Settings};
use semaphore::db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        version = config::APP_VERSION,
        model = %settings.model,
        demo_mode = settings.demo_mode(),
        retrieval = settings.retrieval_enabled,
        "{} starting",
        config::APP_NAME
    );

    if let Some(parent) = settings.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = db::open_database(&settings.database_path)?;
    tracing::info!(path = %settings.database_path.display(), "Database ready");

    let bind_addr = settings.bind_addr.clone();
    let ctx = ApiContext::new(settings, db::shared(conn));
    let router = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Listening");
    axum::serve(listener, router).await?;

    Ok(())
}
