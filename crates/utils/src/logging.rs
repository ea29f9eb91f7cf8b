//! provides logging helpers

use tracing_subscriber::filter;

/// initiate the global tracing subscriber
///
/// Diagnostics go to stderr so the report stream on stdout stays clean.
/// The filter defaults to `INFO` and honors `RUST_LOG`.
pub fn init() {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
