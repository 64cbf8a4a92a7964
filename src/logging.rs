//! Logging setup.
//!
//! All logs go to stderr through `tracing-subscriber`, filtered by
//! `RUST_LOG` (default `info`). Stdout stays reserved for command output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `level` overrides `RUST_LOG` when given (e.g. `"debug"` or
/// `"askdoc=debug,tower_http=info"`).
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(l) => EnvFilter::try_new(l).map_err(|e| anyhow!("Invalid log filter '{}': {}", l, e))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to init logging: {}", e))?;

    Ok(())
}
