// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::future::Future;

use axum_server::tls_rustls::RustlsConfig;
use family_sort_client::{api::router, config::ClientConfig, logging, state::AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    logging::init(config.log_format)?;

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let state = AppState::from_config(&config)?;

    // The stored key is checked in the background; the gate reports
    // `checking` until it settles.
    let gate = state.gate.clone();
    tokio::spawn(async move {
        let outcome = gate.check().await;
        info!(granted = outcome.is_granted(), "Startup access check finished");
    });

    let app = router(state);
    let addr = config.bind_addr().await?;

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!(%addr, api = %config.api_base_url, "Family sort client listening on https (docs at /docs)");
            serve_until_shutdown(
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()),
            )
            .await?;
        }
        None => {
            warn!("TLS_CERT_PATH/TLS_KEY_PATH not set, serving plain HTTP");
            info!(%addr, api = %config.api_base_url, "Family sort client listening on http (docs at /docs)");
            serve_until_shutdown(axum_server::bind(addr).serve(app.into_make_service())).await?;
        }
    }

    Ok(())
}

async fn serve_until_shutdown<F>(server: F) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = server => result,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
            Ok(())
        }
    }
}
