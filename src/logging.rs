use anyhow::Result;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (or `info`) applies to this
/// crate and to request tracing.
pub fn initialize_logging(level: Option<&str>) -> Result<()> {
    let level = level.unwrap_or("info");
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("{}={level},tower_http={level}", env!("CARGO_CRATE_NAME")));

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
