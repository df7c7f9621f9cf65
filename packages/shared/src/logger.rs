//! Logger setup shared by the server and client binaries.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` is applied to the
/// calling binary and the kakurega crates, and `warn` to everything else.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let crate_name = bin_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,{crate_name}={default_level},kakurega_server={default_level},kakurega_client={default_level},kakurega_shared={default_level},tower_http={default_level}"
        ))
    });

    // try_init so that tests and embedders can call this more than once
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
