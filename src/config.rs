use crate::error::InventoryError;
use std::path::PathBuf;
use std::str::FromStr;

/// Which [`crate::store::SessionStore`] backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Disk,
}

impl FromStr for StoreBackend {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "disk" | "file" => Ok(StoreBackend::Disk),
            other => Err(InventoryError::Config(format!(
                "unknown store backend '{}', expected 'memory' or 'disk'",
                other
            ))),
        }
    }
}

/// Server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: String,
    pub backend: StoreBackend,
    /// Directory for the disk backend's session files.
    pub data_dir: PathBuf,
    pub session_ttl_secs: i64,
    pub max_upload_bytes: usize,
    /// Rows returned in the upload preview.
    pub preview_rows: usize,
}

// Defaults
const DEFAULT_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_DATA_DIR: &str = "data";
const SESSION_DURATION: i64 = 24 * 60 * 60; // 24 hours in seconds
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const PREVIEW_ROWS: usize = 100;

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: DEFAULT_ADDR.to_string(),
            backend: StoreBackend::Memory,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            session_ttl_secs: SESSION_DURATION,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            preview_rows: PREVIEW_ROWS,
        }
    }
}

impl Config {
    /// Read `INVENTORY_*` variables from the process environment.
    pub fn from_env() -> Result<Self, InventoryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InventoryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = lookup("INVENTORY_ADDR") {
            config.addr = addr;
        }
        if let Some(backend) = lookup("INVENTORY_STORE") {
            config.backend = backend.parse()?;
        }
        if let Some(dir) = lookup("INVENTORY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ttl) = lookup("INVENTORY_SESSION_TTL_SECS") {
            config.session_ttl_secs = parse_positive("INVENTORY_SESSION_TTL_SECS", &ttl)?;
        }
        if let Some(limit) = lookup("INVENTORY_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_positive("INVENTORY_MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(rows) = lookup("INVENTORY_PREVIEW_ROWS") {
            config.preview_rows = parse_positive("INVENTORY_PREVIEW_ROWS", &rows)?;
        }

        Ok(config)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs)
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, InventoryError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(InventoryError::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, value
        ))),
    }
}
