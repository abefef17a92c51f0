use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::{create_cors_layer, DEFAULT_ALLOWED_ORIGINS};
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/boxoffice";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_QR_SECRET: &str = "boxoffice-development-qr-secret";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 15;

const ESEWA_UAT_PAYMENT_URL: &str = "https://uat.esewa.com.np/epay/main";
const ESEWA_UAT_VERIFICATION_URL: &str = "https://uat.esewa.com.np/epay/transrec";
const ESEWA_TEST_MERCHANT: &str = "EPAYTEST";

const PAYPAL_SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";
const PAYPAL_LIVE_URL: &str = "https://api-m.paypal.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct EsewaConfig {
    pub payment_url: String,
    pub verification_url: String,
    pub merchant_code: String,
    /// Provider redirects back here with `?q=su` or `?q=fu` appended.
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub currency: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub storage: StorageBackend,
    pub bind_addr: SocketAddr,
    pub production: bool,
    pub qr_secret: String,
    pub gateway_timeout: Duration,
    /// Comma separated browser origins allowed to call the API.
    pub cors_allowed_origins: String,
    pub esewa: EsewaConfig,
    pub paypal: PaypalConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let production = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        let storage = match get("STORAGE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let bind_addr = parse("BIND_ADDR", get("BIND_ADDR", DEFAULT_BIND_ADDR))?;
        let database_max_connections =
            parse("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS", "5"))?;
        let timeout_secs: u64 = parse(
            "GATEWAY_TIMEOUT_SECS",
            get("GATEWAY_TIMEOUT_SECS", &DEFAULT_GATEWAY_TIMEOUT_SECS.to_string()),
        )?;

        let qr_secret = match lookup("QR_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if production => return Err(ConfigError::Missing("QR_SECRET")),
            _ => {
                tracing::warn!("QR_SECRET not set, using the development secret");
                DEFAULT_QR_SECRET.to_string()
            }
        };

        let paypal_base_url = match lookup("PAYPAL_BASE_URL") {
            Some(url) => url,
            None => match get("PAYPAL_MODE", "sandbox").to_lowercase().as_str() {
                "sandbox" => PAYPAL_SANDBOX_URL.to_string(),
                "live" => PAYPAL_LIVE_URL.to_string(),
                other => {
                    return Err(ConfigError::Invalid {
                        name: "PAYPAL_MODE",
                        value: other.to_string(),
                    })
                }
            },
        };

        let paypal_client_id = get("PAYPAL_CLIENT_ID", "");
        let paypal_client_secret = get("PAYPAL_CLIENT_SECRET", "");
        if production && paypal_client_id.is_empty() {
            return Err(ConfigError::Missing("PAYPAL_CLIENT_ID"));
        }
        if production && paypal_client_secret.is_empty() {
            return Err(ConfigError::Missing("PAYPAL_CLIENT_SECRET"));
        }

        Ok(Self {
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            database_max_connections,
            storage,
            bind_addr,
            production,
            qr_secret,
            gateway_timeout: Duration::from_secs(timeout_secs),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
            esewa: EsewaConfig {
                payment_url: get("ESEWA_PAYMENT_URL", ESEWA_UAT_PAYMENT_URL),
                verification_url: get("ESEWA_VERIFICATION_URL", ESEWA_UAT_VERIFICATION_URL),
                merchant_code: get("ESEWA_MERCHANT_CODE", ESEWA_TEST_MERCHANT),
                callback_url: get("ESEWA_CALLBACK_URL", "http://localhost:3001/esewa/callback"),
            },
            paypal: PaypalConfig {
                base_url: paypal_base_url.trim_end_matches('/').to_string(),
                client_id: paypal_client_id,
                client_secret: paypal_client_secret,
                currency: get("PAYPAL_CURRENCY", "USD"),
                callback_url: get("PAYPAL_CALLBACK_URL", "http://localhost:3001/paypal/callback"),
            },
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_for_development() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.qr_secret, DEFAULT_QR_SECRET);
        assert_eq!(config.paypal.base_url, PAYPAL_SANDBOX_URL);
        assert_eq!(config.esewa.merchant_code, ESEWA_TEST_MERCHANT);
        assert_eq!(config.cors_allowed_origins, DEFAULT_ALLOWED_ORIGINS);
        assert!(!config.production);
    }

    #[test]
    fn test_cors_origins_come_from_lookup() {
        let config =
            config_from(&[("CORS_ALLOWED_ORIGINS", "https://tickets.example.com")]).unwrap();
        assert_eq!(config.cors_allowed_origins, "https://tickets.example.com");
    }

    #[test]
    fn test_production_requires_qr_secret() {
        let result = config_from(&[
            ("RUST_ENV", "production"),
            ("PAYPAL_CLIENT_ID", "id"),
            ("PAYPAL_CLIENT_SECRET", "secret"),
        ]);
        assert_eq!(result.unwrap_err(), ConfigError::Missing("QR_SECRET"));
    }

    #[test]
    fn test_live_mode_switches_paypal_host() {
        let config = config_from(&[("PAYPAL_MODE", "live")]).unwrap();
        assert_eq!(config.paypal.base_url, PAYPAL_LIVE_URL);
    }

    #[test]
    fn test_invalid_storage_backend() {
        let result = config_from(&[("STORAGE_BACKEND", "sqlite")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                ..
            })
        ));
    }

    #[test]
    fn test_memory_backend_and_timeout() {
        let config =
            config_from(&[("STORAGE_BACKEND", "memory"), ("GATEWAY_TIMEOUT_SECS", "3")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.gateway_timeout, Duration::from_secs(3));
    }
}
