//! Client configuration loaded from the environment.

use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

use crate::models::DEFAULT_CURRENCY;
use crate::retry::RetryConfig;

/// Azure Retail Prices API endpoint
pub const AZURE_PRICING_API: &str = "https://prices.azure.com/api/retail/prices";

/// `api-version` sent with every request
pub const DEFAULT_API_VERSION: &str = "2023-01-01-preview";

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub base_url: String,
    pub api_version: String,
    /// Currency for tool calls that do not name one
    pub default_currency: String,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_url: AZURE_PRICING_API.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl FromEnv for PricingConfig {
    /// Reads `AZURE_PRICING_*` variables, falling back to defaults.
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            base_url: env_or_default("AZURE_PRICING_BASE_URL", &defaults.base_url),
            api_version: env_or_default("AZURE_PRICING_API_VERSION", &defaults.api_version),
            default_currency: env_or_default("AZURE_PRICING_CURRENCY", &defaults.default_currency)
                .to_uppercase(),
            timeout_secs: env_parse("AZURE_PRICING_TIMEOUT_SECS", defaults.timeout_secs)?,
            retry: RetryConfig {
                max_retries: env_parse("AZURE_PRICING_MAX_RETRIES", defaults.retry.max_retries)?,
                initial_delay_ms: env_parse(
                    "AZURE_PRICING_RETRY_BASE_MS",
                    defaults.retry.initial_delay_ms,
                )?,
                max_delay_ms: env_parse("AZURE_PRICING_RETRY_MAX_MS", defaults.retry.max_delay_ms)?,
                ..defaults.retry
            },
        })
    }
}
