// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use relational_eth_custody::{
    api::router,
    blockchain::{ChainClient, RpcChainClient},
    config::{init_tracing, Config},
    engine::CustodyEngine,
    state::AppState,
    storage::{RedbSecretStore, StoragePaths},
};

/// Time given to in-flight requests once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    // Secret store
    let paths = StoragePaths::new(&config.data_dir);
    std::fs::create_dir_all(paths.root())?;
    let store = Arc::new(RedbSecretStore::open(&paths.secrets_db())?);
    info!(path = %paths.secrets_db().display(), "Secret store opened");

    // Chain client
    let chain = Arc::new(RpcChainClient::connect(&config.rpc_url, config.chain_id).await?);
    info!(rpc_url = %config.rpc_url, chain_id = chain.chain_id(), "Chain client ready");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let engine = CustodyEngine::new(store, chain)
        .with_chain_timeout(config.chain_timeout)
        .with_shutdown(shutdown.clone());
    let app = router(AppState::new(engine).with_data_dir(&config.data_dir));
    let addr = config.bind_addr()?;

    match &config.tls {
        Some(tls) => {
            // Another component may already have installed a provider
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            let handle = axum_server::Handle::new();
            let on_shutdown = handle.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                on_shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            info!(%addr, "Custody server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            warn!("TLS_CERT_PATH/TLS_KEY_PATH not set, serving plain HTTP");
            info!(%addr, "Custody server listening on http (docs at /docs)");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await?;
        }
    }

    info!("Custody server stopped");
    Ok(())
}

async fn watch_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested");
    shutdown.cancel();
}
