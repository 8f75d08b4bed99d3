//! Logging setup.
//!
//! Consolidates the teacher's split between `log`, `flexi_logger`, and
//! `tracing` down to plain `tracing` + `tracing-subscriber`. `RUST_LOG`
//! (or `SHIMIKO_LOG_LEVEL` as a friendlier alias) controls verbosity.

use tracing_subscriber::EnvFilter;

pub(crate) fn build_loglevel_filter_layer() -> EnvFilter {
    let level = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("SHIMIKO_LOG_LEVEL"))
        .unwrap_or_else(|_| "info".to_string());
    std::env::set_var("RUST_LOG", &level);
    EnvFilter::from_default_env()
}

/// Installs the global `tracing` subscriber. Safe to call once at process start.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(build_loglevel_filter_layer())
        .with_target(true)
        .init();
}
