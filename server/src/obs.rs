use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the fmt subscriber once; later calls are no-ops.
pub fn init_tracing() -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=warn".to_string());
    let env_filter = EnvFilter::try_new(filter)?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    let _ = INIT.set(());
    Ok(())
}
