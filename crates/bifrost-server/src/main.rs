//! Bifrost identity service
//!
//! HTTP service for VPN enrollment: TOTP seeds, client certificates and an
//! audit log.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use bifrost_core::tracing_init::init_tracing;
use bifrost_crypto::TotpProvisioner;
use bifrost_server::api::build_router;
use bifrost_server::config::Args;
use bifrost_server::service::Services;
use bifrost_server::storage::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_options())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting bifrost-server"
    );

    let db_path = args.db_path()?;
    info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).await?;

    let authority = args.authority()?;
    let services = Services::new(
        &db,
        Arc::new(authority),
        Arc::new(TotpProvisioner),
        args.bundle_sources(),
    );

    let gate = args.secret_gate()?;
    if gate.is_none() {
        warn!("No API secret configured; requests are not authenticated");
    }

    let app = build_router(services, gate);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Bifrost stopped");
    Ok(())
}
