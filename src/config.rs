//! Runtime configuration loaded from the environment

use crate::{
    constants::{AIRTABLE_API_URL, AIRTABLE_TABLE, COINGECKO_API_URL, DEFAULT_PORT},
    error::ConfigError,
};
use std::net::SocketAddr;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (`0.0.0.0:$PORT`)
    pub bind_addr: SocketAddr,
    /// Airtable personal access token
    pub airtable_api_key: String,
    /// Airtable base id
    pub airtable_base_id: String,
    /// Table holding asset records
    pub airtable_table: String,
    /// Airtable REST API root
    pub airtable_api_url: String,
    /// CoinGecko REST API root
    pub coingecko_api_url: String,
}

impl Config {
    /// Loads configuration from `.env` (if present) and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let port = match var("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            airtable_api_key: required("AIRTABLE_API_KEY")?,
            airtable_base_id: required("BASE_ID")?,
            airtable_table: var("AIRTABLE_TABLE").unwrap_or_else(|| AIRTABLE_TABLE.to_string()),
            airtable_api_url: var("AIRTABLE_API_URL")
                .unwrap_or_else(|| AIRTABLE_API_URL.to_string()),
            coingecko_api_url: var("COINGECKO_API_URL")
                .unwrap_or_else(|| COINGECKO_API_URL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("AIRTABLE_API_KEY", "key"), ("BASE_ID", "appX")]))
                .unwrap();

        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.airtable_table, "coins");
        assert_eq!(config.airtable_api_url, AIRTABLE_API_URL);
        assert_eq!(config.coingecko_api_url, COINGECKO_API_URL);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("AIRTABLE_API_KEY", "key"),
            ("BASE_ID", "appX"),
            ("PORT", "9100"),
            ("AIRTABLE_TABLE", "assets"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:9100".parse().unwrap());
        assert_eq!(config.airtable_table, "assets");
    }

    #[test]
    fn test_missing_credentials() {
        let err = Config::from_lookup(lookup(&[("BASE_ID", "appX")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AIRTABLE_API_KEY")));

        let err = Config::from_lookup(lookup(&[("AIRTABLE_API_KEY", "key"), ("BASE_ID", " ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BASE_ID")));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[
            ("AIRTABLE_API_KEY", "key"),
            ("BASE_ID", "appX"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
