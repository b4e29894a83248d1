//! Configuration loading and representation.
//!
//! Configuration is read once at startup and passed explicitly to whatever
//! builds the storage backend; nothing here is global.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string. `None` selects the in-memory backend.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Apply the schema on startup.
    pub run_migrations: bool,
}

impl AppConfig {
    /// Read `BIND_ADDR`, `DATABASE_URL`, `DB_MAX_CONNECTIONS` and `DB_RUN_MIGRATIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            key: "BIND_ADDR",
            reason: format!("{bind_raw:?}: {e}"),
        })?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DB_MAX_CONNECTIONS",
                        reason: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
        };

        let run_migrations = match lookup("DB_RUN_MIGRATIONS") {
            None => true,
            Some(raw) => parse_bool("DB_RUN_MIGRATIONS", &raw)?,
        };

        Ok(Self {
            bind_addr,
            database_url,
            max_connections,
            run_migrations,
        })
    }

    /// In-memory backend on an ephemeral local port (tests, local experiments).
    pub fn in_memory() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: false,
        }
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_without_database_url() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(cfg.run_migrations);
    }

    #[test]
    fn reads_database_settings() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_RUN_MIGRATIONS", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/orders"));
        assert_eq!(cfg.max_connections, 4);
        assert!(!cfg.run_migrations);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            load(&[("DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            load(&[("DB_RUN_MIGRATIONS", "maybe")]),
            Err(ConfigError::Invalid { key: "DB_RUN_MIGRATIONS", .. })
        ));
    }
}
