//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! The interceptor and notifier run once per response and can be noisy, so
//! they opt in per module:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("request {} emitted {} bytes", id, len);
//! ```

/// Info-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Debug-level log. Also emitted at info level when `COURSE_FILTER_DEBUG` is set,
/// so a single env switch surfaces the per-chunk trace without touching `RUST_LOG`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            if $crate::utils::logging::debug_enabled() {
                log::info!($($arg)*);
            } else {
                log::debug!($($arg)*);
            }
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Whether `COURSE_FILTER_DEBUG` is set to `1` or `true`.
pub fn debug_enabled() -> bool {
    std::env::var("COURSE_FILTER_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Initialize `env_logger` from `RUST_LOG`, defaulting to `Info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
