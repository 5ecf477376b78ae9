use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use valuechart::adapters::{
    websocket_router, ChannelTransport, InMemoryChartRepository, StandardChartValidator,
    WebSocketState,
};
use valuechart::application::{HostSettings, SessionRegistry};
use valuechart::config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    let repository = InMemoryChartRepository::new();
    if let Some(path) = &config.server.seed_file {
        let seeded = repository
            .seed_from_json(&tokio::fs::read_to_string(path).await?)
            .await?;
        tracing::info!(path = %path, charts = seeded, "Loaded seed charts");
    }

    let transport = ChannelTransport::new(config.session.channel_capacity);
    let sessions = Arc::new(SessionRegistry::new(
        Arc::new(repository),
        Arc::new(StandardChartValidator::new()),
        Arc::new(transport.clone()),
        HostSettings::from(&config.session),
    ));
    let state = WebSocketState::new(sessions.clone(), transport, config.session.idle_timeout());

    let app = websocket_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "ValueChart session server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    sessions.shutdown_all().await;
    Ok(())
}
