use anyhow::{Context, Result};
use clap::Parser;
use device_telemetry::{cli, config, routes, seed, state};
use tokio::net::TcpListener;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,device_telemetry=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::AddrInUse {
            anyhow::anyhow!(
                "cannot listen on {addr}: port already in use; stop whatever holds it or pass --port to pick a free one"
            )
        } else {
            anyhow::Error::new(err).context(format!("failed to bind listener on {addr}"))
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = config::Config::from_env(&args)?;
    init_tracing()?;

    let registry = seed::load_registry(&config.devices_csv)
        .await
        .context("failed to load devices")?;
    let device_count = registry.count().await;

    let app = routes::router(state::AppState::new(registry));
    let listener = bind_listener(&config.http_bind).await?;
    tracing::info!(
        bind = %config.http_bind,
        devices = device_count,
        "device-telemetry HTTP listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}
