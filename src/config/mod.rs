//! Configuration module for the Zikroullah backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Default number of attempts when allocating a unique invitation key.
pub const DEFAULT_KEY_ATTEMPTS: u32 = 5;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional pre-shared key guarding the `/api` routes
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Attempts before giving up on a colliding invitation key
    pub key_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("ZIKR_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("ZIKR_DB_PATH")
            .unwrap_or_else(|_| "./data/zikroullah.sqlite".to_string())
            .into();

        let bind_addr = env::var("ZIKR_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5001".to_string())
            .parse()?;

        let log_level = env::var("ZIKR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = env::var("ZIKR_LOG_FORMAT")
            .map(|f| LogFormat::from_str(&f))
            .unwrap_or(LogFormat::Pretty);

        let key_attempts = env::var("ZIKR_KEY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_KEY_ATTEMPTS);

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            log_format,
            key_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("ZIKR_API_PSK");
        env::remove_var("ZIKR_DB_PATH");
        env::remove_var("ZIKR_BIND_ADDR");
        env::remove_var("ZIKR_LOG_LEVEL");
        env::remove_var("ZIKR_LOG_FORMAT");
        env::remove_var("ZIKR_KEY_ATTEMPTS");

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/zikroullah.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5001");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.key_attempts, DEFAULT_KEY_ATTEMPTS);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }
}
