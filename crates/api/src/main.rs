use anyhow::Context;

use loomerp_api::app::{build_app, services::AppServices};
use loomerp_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    loomerp_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = AppServices::from_config(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        default_segment = %config.default_segment,
        persistent = config.database.is_some(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
