//! Configuration Module - Collector Tuning Parameters
//!
//! Manages the knobs that affect collection frequency and logging.
//! Most programs run fine on the defaults; the stress switch exists to
//! shake out liveness bugs by collecting at every opportunity.

/// Configuration for the Karst garbage collector.
///
/// # Examples
///
/// ```rust
/// use kgc::GcConfig;
///
/// // Use default configuration
/// let config = GcConfig::default();
///
/// // Stress configuration for debugging liveness
/// let config = GcConfig {
///     stress: true,
///     log: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Allocation threshold (bytes) for the first collection.
    ///
    /// Pacing never drops the threshold below this value.
    /// Default: 1 MiB
    pub initial_threshold: usize,

    /// Heap growth factor applied after each collection.
    ///
    /// The next collection triggers at `bytes_allocated * growth_factor`.
    /// Default: 2
    pub growth_factor: usize,

    /// Collect at every allocation opportunity.
    ///
    /// Makes liveness bugs deterministic at a large throughput cost.
    /// Default: false
    pub stress: bool,

    /// Log collection cycles to stderr.
    ///
    /// Default: false
    pub log: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            initial_threshold: 1024 * 1024,
            growth_factor: 2,
            stress: false,
            log: false,
        }
    }
}

impl GcConfig {
    /// Validate configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kgc::GcConfig;
    ///
    /// let config = GcConfig {
    ///     growth_factor: 1,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(
                "initial_threshold must be > 0".to_string(),
            ));
        }

        if self.growth_factor < 2 {
            return Err(ConfigError::InvalidGrowthFactor(
                "growth_factor must be >= 2".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables.
    ///
    /// Overrides defaults with:
    /// - `KGC_THRESHOLD` - initial threshold in bytes
    /// - `KGC_GROWTH` - growth factor
    /// - `KGC_STRESS` - collect on every allocation (`1` or `true`)
    /// - `KGC_LOG` - log collection cycles (`1` or `true`)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("KGC_THRESHOLD") {
            if let Ok(bytes) = val.parse::<usize>() {
                config.initial_threshold = bytes;
            }
        }

        if let Ok(val) = std::env::var("KGC_GROWTH") {
            if let Ok(factor) = val.parse::<usize>() {
                config.growth_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("KGC_STRESS") {
            config.stress = val == "1" || val.eq_ignore_ascii_case("true");
        }

        if let Ok(val) = std::env::var("KGC_LOG") {
            config.log = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid growth factor: {0}")]
    InvalidGrowthFactor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.growth_factor, 2);
        assert!(!config.stress);
    }

    #[test]
    fn test_zero_threshold_is_invalid() {
        let config = GcConfig {
            initial_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_growth_factor_below_two_is_invalid() {
        let config = GcConfig {
            growth_factor: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
