use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::FleetCatalog;
use crate::engine::AllocationPolicy;

/// Runtime settings, read from `FLEETBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// JSON fleet file; the built-in fleet is used when absent.
    pub fleet_path: Option<PathBuf>,
    pub policy: AllocationPolicy,
    pub lock_timeout: Duration,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fleet_path: None,
            policy: AllocationPolicy::FirstFit,
            lock_timeout: Duration::from_millis(5000),
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to defaults; set but
    /// malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> io::Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup("FLEETBOOK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.fleet_path = lookup("FLEETBOOK_FLEET").map(PathBuf::from);
        if let Some(policy) = lookup("FLEETBOOK_POLICY") {
            config.policy = policy
                .parse()
                .map_err(|e: String| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        }
        if let Some(ms) = lookup("FLEETBOOK_LOCK_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("FLEETBOOK_LOCK_TIMEOUT_MS: not a number: {ms}"),
                )
            })?;
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(port) = lookup("FLEETBOOK_METRICS_PORT") {
            let port: u16 = port.trim().parse().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("FLEETBOOK_METRICS_PORT: not a port: {port}"),
                )
            })?;
            config.metrics_port = Some(port);
        }
        Ok(config)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }

    pub fn load_catalog(&self) -> io::Result<FleetCatalog> {
        match &self.fleet_path {
            Some(path) => FleetCatalog::from_json(path),
            None => Ok(FleetCatalog::builtin()),
        }
    }
}
