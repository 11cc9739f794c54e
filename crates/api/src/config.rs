//! Gateway Configuration

use crate::rate_limit::RateLimitConfig;
use serde::Deserialize;

/// Server configuration
///
/// Values come from `GATEWAY_*` environment variables layered over the
/// defaults; nested keys use a double underscore, e.g.
/// `GATEWAY_RATE_LIMIT__BURST_SIZE`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Socket address to bind
    pub bind_addr: String,
    /// Rate limiting for incoming requests
    pub rate_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("rate_limit.per_second", defaults.rate_limit.per_second)?
            .set_default(
                "rate_limit.burst_size",
                u64::from(defaults.rate_limit.burst_size),
            )?
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.rate_limit.per_second, 2);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("GATEWAY_BIND_ADDR", "127.0.0.1:9000");
        let config = GatewayConfig::from_env().unwrap();
        std::env::remove_var("GATEWAY_BIND_ADDR");

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.rate_limit.burst_size, 8);
    }
}
