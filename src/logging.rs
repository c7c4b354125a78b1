use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Filter used when RUST_LOG is not set
fn default_filter(verbose: bool) -> &'static str {
    if verbose || cfg!(debug_assertions) {
        "debug"
    } else {
        // Release builds default to INFO to avoid excessive logs.
        "info"
    }
}

/// Initialize logging to stderr so command output on stdout stays clean.
///
/// Behavior:
/// - `--verbose` forces debug level.
/// - Otherwise RUST_LOG is honoured, falling back to a build-dependent default.
pub fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(default_filter(true))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(false)))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    // A second initialisation (tests, embedding) keeps the first subscriber
    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        tracing::debug!("Logging already initialized");
        return;
    }

    tracing::debug!("Logging initialized");
}
