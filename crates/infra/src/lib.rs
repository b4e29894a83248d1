//! Infrastructure layer: storage backends and configuration.

pub mod config;
pub mod db;


pub use config::{AppConfig, ConfigError};
pub use db::{InMemoryDatabase, PgDatabase};
