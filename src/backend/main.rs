/**
 * XFBoard Server Entry Point
 *
 * Loads configuration, builds the application state and serves the room
 * coordinator until ctrl-c. On shutdown every room with unpersisted changes
 * is flushed to storage.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use xfboard::backend::server::{build_state, config::ServerConfig, create_app};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Server initialization started");

    let config = ServerConfig::load()?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = build_state(config).await?;
    let rooms = state.rooms.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[STARTUP] Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[SHUTDOWN] Flushing rooms");
    let (written, failures) = rooms.flush_all().await;
    if !failures.is_empty() {
        tracing::error!(
            written,
            failed = failures.len(),
            "[SHUTDOWN] Some rooms could not be persisted"
        );
    }

    Ok(())
}

#[cfg(feature = "ssr")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[SHUTDOWN] Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[SHUTDOWN] Signal received, no longer accepting connections");
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin xfboard-server --features ssr");
    std::process::exit(1);
}
