//! Configuration module for the lead tracker.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Where records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// SQLite file at `db_path`
    Sqlite,
    /// Process memory; everything is lost on exit
    Memory,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StorageBackend::Sqlite),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Record storage backend
    pub storage: StorageBackend,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("CRM_DB_PATH")
            .unwrap_or_else(|_| "./data/crm.sqlite".to_string())
            .into();

        let index_path = env::var("CRM_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr_raw =
            env::var("CRM_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr_raw.parse().map_err(|_| {
            AppError::Internal(format!("Invalid CRM_BIND_ADDR format: {}", bind_addr_raw))
        })?;

        let log_level = env::var("CRM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let storage = match env::var("CRM_STORAGE") {
            Ok(raw) => StorageBackend::parse(&raw).ok_or_else(|| {
                AppError::Internal(format!(
                    "Invalid CRM_STORAGE value: {} (expected sqlite or memory)",
                    raw
                ))
            })?,
            Err(_) => StorageBackend::Sqlite,
        };

        Ok(Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            storage,
        })
    }
}
