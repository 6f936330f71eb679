use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub event: EventConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    UserToken,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("turnstile.db")
}

/// Event-specific knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventConfig {
    /// Fixed price per ticket, in the event's smallest currency unit.
    #[serde(default = "default_ticket_price")]
    pub ticket_price: i64,
    /// Path marker used to extract a code from a scanned magic link,
    /// e.g. "/t/" in "https://tickets.example.com/t/AB12".
    #[serde(default = "default_link_path_marker")]
    pub link_path_marker: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            ticket_price: default_ticket_price(),
            link_path_marker: default_link_path_marker(),
        }
    }
}

fn default_ticket_price() -> i64 {
    1500
}

fn default_link_path_marker() -> String {
    "/t/".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub event: EventConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::UserToken => "user_token".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            event: config.event.clone(),
        }
    }
}
