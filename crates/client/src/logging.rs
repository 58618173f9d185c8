//! Logging module.
//!
//! Provides the crate's logging macros, which format their arguments and
//! forward them to `tracing`, and a helper that installs a subscriber.

/// Log an info message
pub fn log_info_impl(msg: &str) {
    tracing::info!("{}", msg);
}

/// Log an error message
pub fn log_error_impl(msg: &str) {
    tracing::error!("{}", msg);
}

/// Log a warning message
pub fn log_warn_impl(msg: &str) {
    tracing::warn!("{}", msg);
}

/// Log a debug message
pub fn log_debug_impl(msg: &str) {
    tracing::debug!("{}", msg);
}

/// Install a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `fleetlink_client=debug`.
/// Calling this more than once is harmless.
pub fn init() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetlink_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_info_impl(&format!($($arg)*))
    };
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_error_impl(&format!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log_warn_impl(&format!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_debug_impl(&format!($($arg)*))
    };
}
