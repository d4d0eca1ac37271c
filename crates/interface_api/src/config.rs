//! API configuration

use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection string; the in-memory store is used when unset
    pub database_url: Option<String>,
    /// Base URL of the risk analysis service
    pub risk_api_url: String,
    /// Bearer token for the risk analysis service
    pub risk_api_key: String,
    /// Base URL of the ledger gateway
    pub ledger_api_url: String,
    /// Bearer token for the ledger gateway
    pub ledger_api_key: String,
    /// Log level
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            risk_api_url: "http://localhost:9100/api/v1".to_string(),
            risk_api_key: "dev-key".to_string(),
            ledger_api_url: "http://localhost:9200/api/v1".to_string(),
            ledger_api_key: "dev-key".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_`-prefixed environment variables
    ///
    /// Defaults are layered underneath, so a partially set environment
    /// overrides only the variables it provides.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = ApiConfig::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("risk_api_url", defaults.risk_api_url)?
            .set_default("risk_api_key", defaults.risk_api_key)?
            .set_default("ledger_api_url", defaults.ledger_api_url)?
            .set_default("ledger_api_key", defaults.ledger_api_key)?
            .set_default("log_level", defaults.log_level)?
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partially_set_environment_overrides_only_its_variables() {
        std::env::set_var("API_PORT", "9999");
        let config = ApiConfig::from_env().unwrap();
        std::env::remove_var("API_PORT");

        let defaults = ApiConfig::default();
        assert_eq!(config.port, 9999);
        assert_eq!(config.host, defaults.host);
        assert_eq!(config.risk_api_url, defaults.risk_api_url);
        assert!(config.database_url.is_none());
    }
}
