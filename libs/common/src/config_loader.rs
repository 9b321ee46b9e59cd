//! Setting resolution across command line, environment and config file

use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

/// Get configuration value with priority: CLI > ENV > file/default
///
/// # Arguments
/// * `cli_value` - Value given on the command line, if any
/// * `env_var` - Environment variable name to check
/// * `fallback` - Value from the configuration file (or its default)
pub fn get_config_value<T>(cli_value: Option<T>, env_var: &str, fallback: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(val) = cli_value {
        info!(setting = env_var, source = "cli", "Setting overridden");
        return val;
    }

    let Ok(raw) = std::env::var(env_var) else {
        return fallback;
    };
    match raw.parse::<T>() {
        Ok(val) => {
            info!(setting = env_var, source = "env", value = %raw, "Setting overridden");
            val
        },
        Err(e) => {
            warn!(setting = env_var, value = %raw, error = %e, "Ignoring unparsable environment value");
            fallback
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_get_config_value_priority() {
        // CLI wins
        let val = get_config_value(Some(57600u32), "TEST_STOVE_BAUD_UNSET", 38400);
        assert_eq!(val, 57600);

        // Nothing set -> fallback
        let val = get_config_value(None, "TEST_STOVE_BAUD_UNSET", 38400u32);
        assert_eq!(val, 38400);
    }

    #[test]
    fn test_get_config_value_bad_env_falls_back() {
        std::env::set_var("TEST_STOVE_BAUD_GARBAGE", "fast");
        let val = get_config_value(None, "TEST_STOVE_BAUD_GARBAGE", 38400u32);
        assert_eq!(val, 38400);
        std::env::remove_var("TEST_STOVE_BAUD_GARBAGE");
    }
}
