//! Server configuration read from the environment

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/admin.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";
pub const DEFAULT_BASE_PATH: &str = "/api";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported DATABASE_URL '{0}': expected a sqlite: or mysql: URL")]
    UnsupportedDatabase(String),
}

/// Backend selected by the `DATABASE_URL` scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    MySql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub backend: Backend,
    pub bind_address: SocketAddr,
    pub base_path: String,
    pub max_connections: u32,
    pub environment: Environment,
    pub seed_sample_data: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let backend = backend_for(&database_url)?;

        let bind_address = lookup("ADMIN_BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address
            .parse()
            .map_err(|error: std::net::AddrParseError| ConfigError::InvalidValue {
                name: "ADMIN_BIND_ADDRESS",
                value: bind_address.clone(),
                reason: error.to_string(),
            })?;

        let base_path = lookup("ADMIN_BASE_PATH").unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());
        if !base_path.is_empty() && !base_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                name: "ADMIN_BASE_PATH",
                value: base_path,
                reason: "must start with '/'".to_string(),
            });
        }

        let max_connections = match lookup("ADMIN_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(value) => match value.parse::<u32>() {
                Ok(count) if count > 0 => count,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "ADMIN_MAX_CONNECTIONS",
                        value,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            },
        };

        let environment = match lookup("ADMIN_ENVIRONMENT").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "ADMIN_ENVIRONMENT",
                    value: other.to_string(),
                    reason: "expected 'development' or 'production'".to_string(),
                })
            }
        };

        let seed_sample_data = match lookup("ADMIN_SEED_SAMPLE_DATA") {
            None => false,
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: "ADMIN_SEED_SAMPLE_DATA",
                value,
                reason: "expected true or false".to_string(),
            })?,
        };

        Ok(Self {
            database_url,
            backend,
            bind_address,
            base_path,
            max_connections,
            environment,
            seed_sample_data,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn backend_for(url: &str) -> Result<Backend, ConfigError> {
    if url.starts_with("sqlite:") {
        Ok(Backend::Sqlite)
    } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
        Ok(Backend::MySql)
    } else {
        Err(ConfigError::UnsupportedDatabase(url.to_string()))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
