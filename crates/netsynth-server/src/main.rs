//! Binary entrypoint for the netsynth HTTP server.
//!
//! Configuration comes from `NETSYNTH_*` environment variables (see
//! [`ServerConfig::from_lookup`]); log filtering from `RUST_LOG`.

use tracing_subscriber::EnvFilter;

use netsynth_server::config::ServerConfig;
use netsynth_server::router::build_router;
use netsynth_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let addr = config.bind_addr();
    tracing::info!(
        yosys = %config.yosys_bin.display(),
        max_concurrent = config.max_concurrent,
        mode = ?config.admission_mode,
        timeout_secs = config.timeout.as_secs(),
        scratch = %config.scratch_dir.display(),
        "netsynth configuration loaded"
    );

    let state = AppState::new(config);
    let app = build_router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!("netsynth server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    state.service.admission().close();

    if let Err(err) = served {
        tracing::error!(error = %err, "server terminated");
        std::process::exit(1);
    }
    tracing::info!("netsynth server stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, draining in-flight jobs");
}
