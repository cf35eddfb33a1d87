//! Rate limiter configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::ConfigError;

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Minimum delay between the starts of two consecutive tasks
    #[serde(rename = "min-interval-ms", default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Priority dispatches allowed for every preemptible dispatch
    #[serde(default = "default_ratio")]
    pub ratio: u32,
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_ratio() -> u32 {
    3
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            ratio: default_ratio(),
        }
    }
}

impl RateLimiterConfig {
    /// Config with the given interval and the default ratio
    pub fn with_interval_ms(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            ..Default::default()
        }
    }

    /// Get the minimum interval as a Duration
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Reject configurations the scheduler cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!(min_interval_ms = %self.min_interval_ms, ratio = %self.ratio, "RateLimiterConfig::validate: called");
        if self.min_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.min_interval_ms, 1000);
        assert_eq!(config.ratio, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_min_interval_duration() {
        let config = RateLimiterConfig::with_interval_ms(2000);
        assert_eq!(config.min_interval(), Duration::from_millis(2000));
        assert_eq!(config.ratio, 3);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = RateLimiterConfig {
            min_interval_ms: 0,
            ratio: 3,
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_zero_ratio_allowed() {
        let config = RateLimiterConfig {
            min_interval_ms: 10,
            ratio: 0,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_defaults_and_renames() {
        let config: RateLimiterConfig = serde_json::from_str(r#"{"min-interval-ms": 250}"#).unwrap();
        assert_eq!(config.min_interval_ms, 250);
        assert_eq!(config.ratio, 3);

        let json = serde_json::to_string(&RateLimiterConfig::default()).unwrap();
        assert!(json.contains("\"min-interval-ms\":1000"));
    }
}
