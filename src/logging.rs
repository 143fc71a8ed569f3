//! Tracing subscriber setup for the binary

use crate::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve the filter directive; `verbose` forces debug
pub fn filter_directive(log_level: &str, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else {
        log_level
    }
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` takes precedence over the given level. Output goes to stderr
/// so stdout stays free for results.
pub fn init(log_level: &str, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(log_level, verbose)))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(env_filter)
        .try_init()?;

    Ok(())
}
