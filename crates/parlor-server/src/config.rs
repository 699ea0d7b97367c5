//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the service can start with zero
//! configuration on a developer machine.

use std::path::PathBuf;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Data directory root.
    /// Env: `PARLOR_DATA_DIR`
    /// Default: `None` (platform data directory).
    pub data_dir: Option<PathBuf>,

    /// How long a story stays visible, in hours.
    /// Env: `PARLOR_STORY_TTL_HOURS`
    /// Default: `24`
    pub story_ttl_hours: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            story_ttl_hours: 24,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PARLOR_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(val) = std::env::var("PARLOR_STORY_TTL_HOURS") {
            match val.parse::<u32>() {
                Ok(hours) if hours > 0 => config.story_ttl_hours = hours,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid PARLOR_STORY_TTL_HOURS, using default"
                    );
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.data_dir.is_none());
        assert_eq!(config.story_ttl_hours, 24);
    }
}
