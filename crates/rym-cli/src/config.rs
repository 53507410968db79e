//! CLI configuration via environment variables
//!
//! Directory overrides are read by clap (`RYM_*_DIR`); this covers the
//! switches that are not command arguments.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (RYM_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var("RYM_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_from_env() {
        env::set_var("RYM_NO_COLOR", "1");
        assert!(Config::from_env().no_color);
        env::remove_var("RYM_NO_COLOR");
    }
}
