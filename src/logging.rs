//! Tracing setup for the binary.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialise the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `verbose`.
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "cake_console=debug"
        } else {
            "cake_console=warn"
        })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}
