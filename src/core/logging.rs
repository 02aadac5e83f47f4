//! Logging initialization and utilities

/// Default filter used when neither `RUST_LOG` nor a configured filter is set.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// vireo::core::logging::init();
/// log::info!("Runtime started");
/// ```
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Initialize logging with `filter` as the fallback when `RUST_LOG` is unset.
///
/// Returns `false` if a logger was already installed, which is common when
/// the runtime is embedded in a host that configures logging itself.
pub fn init_with_filter(filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init()
        .is_ok()
}
