//! Hydration configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CACHE_TIME_MS;
use crate::error::{QsnapError, Result};

/// Defaults that the producing and consuming side must agree on.
///
/// The producer omits a record's `cacheTime` when it equals
/// `default_cache_time_ms`; the consumer fills that same value back in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationConfig {
    /// Default retention duration in milliseconds
    pub default_cache_time_ms: u64,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            default_cache_time_ms: DEFAULT_CACHE_TIME_MS,
        }
    }
}

impl HydrationConfig {
    /// Creates a config with a custom default retention duration.
    pub fn with_default_cache_time(cache_time: Duration) -> Self {
        Self {
            default_cache_time_ms: duration_to_ms(cache_time),
        }
    }

    /// Returns the default retention duration.
    pub fn default_cache_time(&self) -> Duration {
        Duration::from_millis(self.default_cache_time_ms)
    }

    /// Validates the configuration.
    ///
    /// Retention values above 2^53 do not survive JSON decoders that read
    /// numbers as doubles.
    pub fn validate(&self) -> Result<()> {
        if self.default_cache_time_ms > MAX_SAFE_INTEGER {
            return Err(QsnapError::ConfigError(format!(
                "default_cache_time_ms {} exceeds {}",
                self.default_cache_time_ms, MAX_SAFE_INTEGER
            )));
        }
        Ok(())
    }
}

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
