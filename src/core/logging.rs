//! Logger setup

use env_logger::{Builder, Env};

/// Default filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_FILTER: &str = "info";

/// Install `env_logger`.
///
/// `RUST_LOG` wins over `filter`. Returns `false` if a logger was already
/// installed, which is expected in tests and when embedding the engine.
pub fn init_logging(filter: Option<&str>) -> bool {
    let env = Env::default().default_filter_or(filter.unwrap_or(DEFAULT_FILTER));
    Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_logging(Some("debug"));
        assert!(!init_logging(None));
    }
}
