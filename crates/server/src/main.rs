mod config;
mod convert;
mod error;
mod pages;
mod routes;
mod storage;

use config::ServerConfig;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feature_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tokio::fs::create_dir_all(config.upload_dir()).await?;
    tokio::fs::create_dir_all(config.native_dir()).await?;
    if !config.converter.exists() {
        tracing::warn!(
            "converter not found at {}; uploads will fail until MTK_CONVERTER points to it",
            config.converter.display()
        );
    }

    let addr = config.bind_addr;
    tracing::info!(
        "{} serving {} ({:?})",
        config.variant.page_title(),
        config.data_dir.display(),
        config.variant
    );
    let app = routes::router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
