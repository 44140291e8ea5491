// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use umkm_admin_server::{
    api::router,
    config::{AppConfig, LogFormat},
    state::AppState,
};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
/// Time in-flight requests get to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn shutdown_signal(handle: Handle<SocketAddr>, state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    state.cancel_after(SHUTDOWN_GRACE).await;
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let addr = config.bind_addr().expect("Failed to parse bind address");

    let state = AppState::from_config(&config).expect("Failed to initialize application state");

    if !state.gateway.is_configured() {
        warn!("VAULT_ADDR/VAULT_TOKEN not set; PII endpoints will answer 503");
    }

    let app = router(state.clone()).into_make_service_with_connect_info::<SocketAddr>();

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone(), state));

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate and key");

            info!(%addr, data_dir = %config.data_dir.display(), "UMKM admin server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app)
                .await
                .expect("HTTPS server failed");
        }
        None => {
            warn!("TLS_CERT_PATH/TLS_KEY_PATH not set; serving plain HTTP");
            info!(%addr, data_dir = %config.data_dir.display(), "UMKM admin server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app)
                .await
                .expect("HTTP server failed");
        }
    }

    info!("Server stopped");
}
