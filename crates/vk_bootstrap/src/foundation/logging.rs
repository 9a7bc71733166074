//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

use env_logger::{Builder, Env};

/// Initialize the logging system
///
/// `default_filter` applies when `RUST_LOG` is not set. Calling this more
/// than once keeps the first logger.
pub fn init(default_filter: &str) {
    let env = Env::default().default_filter_or(default_filter);
    if Builder::from_env(env).format_timestamp_millis().try_init().is_err() {
        log::debug!("Logger already initialized, keeping the existing one");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init("debug");
        init("trace");
        info!("logger initialized");
    }
}
