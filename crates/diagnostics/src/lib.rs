//! Structured logging for the overlay filesystem crates
//!
//! Every crate in the workspace logs through the macros exported here so a
//! single environment variable controls verbosity for the whole process.
//!
//! Usage:
//! - Set OVERLAYFS_LOG=off (default) - no logs
//! - Set OVERLAYFS_LOG=info - materializations, removals, proxy transitions
//! - Set OVERLAYFS_LOG=debug - every redirect and passthrough decision

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`]
pub const LOG_ENV: &str = "OVERLAYFS_LOG";

static INIT: Once = Once::new();

/// Map an `OVERLAYFS_LOG` value to a minimum level.
///
/// `None` means logging is switched off. Unknown values fall back to `Info`.
pub fn parse_level(value: &str) -> Option<emit::Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "" => None,
        "debug" => Some(emit::Level::Debug),
        "info" => Some(emit::Level::Info),
        "warn" => Some(emit::Level::Warn),
        "error" => Some(emit::Level::Error),
        _ => Some(emit::Level::Info),
    }
}

/// Initialize diagnostics based on the OVERLAYFS_LOG environment variable
///
/// This should be called once at startup. It's safe to call multiple
/// times - subsequent calls will be ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());
        let Some(level) = parse_level(&value) else {
            return;
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The runtime lives for the rest of the process.
        std::mem::forget(rt);
    });
}

/// Log basic operations (materializations, removals, proxy transitions)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (path classification, redirect decisions)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable anomalies (partial descriptor, missing backing file)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that prevent an operation from completing
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_call_multiple_times() {
        init_diagnostics();
        init_diagnostics();
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("off"), None);
        assert_eq!(parse_level(""), None);
        assert_eq!(parse_level("DEBUG"), Some(emit::Level::Debug));
        assert_eq!(parse_level("warn"), Some(emit::Level::Warn));
        assert_eq!(parse_level("error"), Some(emit::Level::Error));
        assert_eq!(parse_level("chatty"), Some(emit::Level::Info));
    }

    #[test]
    fn test_macros_compile() {
        let path = "C:\\game\\save.dat";
        log_info!("Materialized {path}", path: path);
        log_debug!("Passthrough {path}", path: path);
        log_warn!("Descriptor stopped at {offset}", offset: 12);
        log_error!("Scratch root unavailable");

        info!("short form");
        debug!("short form {value}", value: 1);
        warn!("short form");
        error!("short form");
    }
}
