//! Entry point for the `ferrest-server` binary.

use ferrest_server::{demo::demo_router, RestServer, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferrest_server=info,ferrest_core=info".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    let router = match demo_router() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "route table rejected");
            std::process::exit(2);
        }
    };

    info!(
        addr = %config.listen_addr,
        hostname = %config.hostname,
        keep_alive_secs = config.keep_alive_secs,
        "configuration loaded"
    );

    let server = RestServer::new(router, &config);
    let listener = match server.bind().await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.serve_with_shutdown(listener, shutdown).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
    info!("shutdown complete");
}
