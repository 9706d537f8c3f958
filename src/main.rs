//! menumeter: CPU, memory, temperature, battery and network sampling with
//! rolling histories, logged once per tick.
//!
//! Run with:  `RUST_LOG=debug menumeter`

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("menumeter v{} starting", env!("CARGO_PKG_VERSION"));

    meter_app::run().await
}
