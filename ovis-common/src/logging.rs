//! Logging initialization
//!
//! Binaries call [`init_tracing`] once at startup. Library code only emits
//! events through the `tracing` macros.

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events are enabled by the default filter
const CRATE_TARGETS: &[&str] = &["ovis_infer", "ovis_common"];

/// Build the default filter directive for `level`, e.g. `ovis_infer=info,ovis_common=info`
pub fn default_directive(level: &str) -> String {
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("Logging already initialized: {}", e)))
}
