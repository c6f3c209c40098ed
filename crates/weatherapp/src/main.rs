use anyhow::anyhow;
use axum::serve;
use futures::TryFutureExt;
use log::{error, info};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, signal};
use weatherapp::{
    app, get_config_info, get_log_level, load_seasonal_ranges, setup_logger, AppState, Database,
};
use weatherapp_core::ensure_dir_exists;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info()?;
    let log_level = get_log_level(&cli);

    setup_logger()
        .level(log_level)
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("weatherapp", log_level)
        .level_for("http_response", log_level)
        .level_for("http_request", log_level)
        .apply()?;

    let data_dir = cli.data_dir();
    let host = cli.host();
    let port = cli.port();

    ensure_dir_exists(&data_dir)?;

    let seasonal_ranges = load_seasonal_ranges(cli.seasonal_ranges.as_deref())?;

    let socket_addr = SocketAddr::from_str(&format!("{}:{}", host, port))
        .map_err(|e| anyhow!("invalid address: {}", e))?;

    let listener = TcpListener::bind(socket_addr)
        .map_err(|e| anyhow!("error binding to socket: {}", e))
        .await?;

    info!("Weather archive starting...");
    info!("  Listen: http://{}", socket_addr);
    info!("  Docs:   http://{}/docs", socket_addr);
    info!("  Data:   {}", data_dir);
    if let Some(seed) = cli.rng_seed {
        info!("  Generator seed: {}", seed);
    }

    let db = Arc::new(Database::new(&data_dir).await.map_err(|e| {
        error!("error setting up SQLite database: {}", e);
        e
    })?);
    db.health_check().await?;

    let app_state = AppState::new(db.clone(), seasonal_ranges, cli.rng_seed);
    let app = app(app_state);

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.checkpoint().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
