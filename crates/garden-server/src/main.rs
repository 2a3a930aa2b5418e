//! garden-server - REST API server binary.

use std::net::SocketAddr;

use garden_core::{EventBus, Garden, GardenConfig};
use garden_server::{create_server, AppState};
use tokio::signal;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
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

/// Install the tracing subscriber. `GARDEN_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("garden_server=debug".parse()?);

    let json = std::env::var("GARDEN_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

fn load_config() -> Result<GardenConfig, Box<dyn std::error::Error>> {
    match std::env::var("GARDEN_CONFIG") {
        Ok(path) => {
            info!("Loading config from {}", path);
            Ok(GardenConfig::from_file(path)?)
        }
        Err(_) => Ok(GardenConfig::from_env()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    // Get configuration from environment
    let host = std::env::var("GARDEN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("GARDEN_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let config = load_config()?;
    info!(db_path = %config.db_path.display(), "Opening garden");

    // Log lifecycle events as they happen
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(
                event_type = event.event_type(),
                user_id = event.user_id(),
                "Garden event"
            );
        }
    });

    let garden = Garden::open(config)?.with_event_bus(bus);
    let app = create_server(AppState::new(garden));

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting garden-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped cleanly");
    Ok(())
}
