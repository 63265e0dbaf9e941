//! Forecast cache configuration.

use serde::{Deserialize, Serialize};

use crate::cache::MokaCacheConfig;

/// In-process forecast cache
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Memory budget in megabytes (default: 64)
    #[serde(default = "default_max_capacity_mb")]
    pub max_capacity_mb: u64,
}

const fn default_max_capacity_mb() -> u64 {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity_mb: default_max_capacity_mb(),
        }
    }
}

impl From<CacheConfig> for MokaCacheConfig {
    fn from(config: CacheConfig) -> Self {
        Self {
            max_capacity_mb: config.max_capacity_mb,
        }
    }
}
