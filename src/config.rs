use std::env;
use std::net::SocketAddr;

use crate::error::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub bind: SocketAddr,
    pub api_prefix: String,
    pub metrics_namespace: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "loan-service".to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_prefix: "/api".to_string(),
            metrics_namespace: "loan_service".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let app_name = env::var("APP_NAME").unwrap_or(defaults.app_name);
        if app_name.trim().is_empty() {
            return Err(ConfigError::invalid("APP_NAME", "cannot be empty"));
        }

        let bind = match env::var("APP_BIND") {
            Ok(v) => v
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::invalid("APP_BIND", "must be a socket address like 0.0.0.0:8080"))?,
            Err(_) => defaults.bind,
        };

        let api_prefix = env::var("API_PREFIX").unwrap_or(defaults.api_prefix);
        if !is_valid_prefix(&api_prefix) {
            return Err(ConfigError::invalid(
                "API_PREFIX",
                "must start with '/', must not end with '/' and must not contain whitespace",
            ));
        }

        let metrics_namespace = env::var("METRICS_NAMESPACE").unwrap_or(defaults.metrics_namespace);
        if !is_valid_metric_name(&metrics_namespace) {
            return Err(ConfigError::invalid("METRICS_NAMESPACE", "invalid format"));
        }

        let log_level = env::var("LOG_LEVEL")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or(defaults.log_level);
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::invalid(
                "LOG_LEVEL",
                "must be one of trace, debug, info, warn, error",
            ));
        }

        Ok(Config {
            app_name,
            bind,
            api_prefix,
            metrics_namespace,
            log_level,
        })
    }
}

// The API prefix always mounts under a real segment, so "" is rejected here
// even though the assembler accepts it for root groups.
fn is_valid_prefix(s: &str) -> bool {
    s.len() > 1 && s.starts_with('/') && !s.ends_with('/') && !s.chars().any(char::is_whitespace)
}

fn is_valid_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
