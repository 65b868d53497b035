use std::sync::Arc;

use puzzlegold_relay::channels::{Channel, TelegramChannel};
use puzzlegold_relay::config::RelayConfig;
use puzzlegold_relay::health;
use puzzlegold_relay::relay::Relay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source_channel,
        destination = %config.dest_channel,
        port = config.http_port,
        "PuzzleGold relay starting"
    );

    // Liveness server runs independently of the relay loop.
    let port = config.http_port;
    let liveness = tokio::spawn(async move {
        if let Err(e) = health::bind_and_serve(port).await {
            tracing::error!(port, error = %e, "Liveness server stopped");
        }
    });

    let Some(credentials) = config.credentials.clone() else {
        tracing::warn!("API_ID/API_HASH/SESSION_STRING not set. Only the liveness endpoint is running.");
        liveness.await?;
        return Ok(());
    };

    tracing::info!(api_id = credentials.api_id, "Starting Telegram client...");
    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::from_config(&config, &credentials));

    if let Err(e) = channel.health_check().await {
        tracing::error!(error = %e, "Telegram health check failed");
    }
    match channel.channel_info(&config.source_channel).await {
        Ok(info) => tracing::info!(
            id = info.id,
            title = info.title.as_deref().unwrap_or(""),
            "Watching channel: @{}",
            config.source_channel
        ),
        Err(e) => tracing::warn!(
            source = %config.source_channel,
            error = %e,
            "Could not resolve source channel"
        ),
    }

    let relay = Relay::from_config(Arc::clone(&channel), &config)?;
    tracing::info!(destination = relay.destination(), "Relay ready");
    let relay_task = tokio::spawn(async move {
        if let Err(e) = relay.run().await {
            tracing::error!(error = %e, "Relay loop stopped");
        }
    });

    // The relay stopping must not take the liveness endpoint down with it.
    let (relay_result, liveness_result) = tokio::join!(relay_task, liveness);
    relay_result?;
    liveness_result?;

    channel.shutdown().await?;
    Ok(())
}
