//! Configuration storage adapters.
//!
//! [`MemConfigStore`] keeps a postcard blob in memory, the same encoding a
//! flash-backed store would write.  [`JsonFileStore`] reads and writes a
//! human-editable JSON file for the host simulator.
//!
//! Both validate before persisting and after loading.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::BmsConfig;
use crate::error::ConfigError;

/// Upper bound on the encoded config blob.
pub const MAX_BLOB_SIZE: usize = 512;

/// In-memory config store holding a postcard-encoded blob.
#[derive(Debug, Default)]
pub struct MemConfigStore {
    blob: Option<Vec<u8>>,
}

impl MemConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw bytes (e.g. a blob read back from flash).
    pub fn with_blob(blob: Vec<u8>) -> Self {
        Self { blob: Some(blob) }
    }

    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }
}

impl ConfigPort for MemConfigStore {
    fn load(&self) -> Result<BmsConfig, ConfigError> {
        let bytes = self.blob.as_deref().ok_or(ConfigError::NotFound)?;
        let cfg: BmsConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("MemConfigStore: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &BmsConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            warn!("MemConfigStore: blob too large ({} bytes)", bytes.len());
            return Err(ConfigError::IoError);
        }
        self.blob = Some(bytes);
        Ok(())
    }
}

/// JSON file config store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonFileStore {
    fn load(&self) -> Result<BmsConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ConfigError::NotFound),
            Err(_) => return Err(ConfigError::IoError),
        };
        let cfg: BmsConfig = serde_json::from_str(&text).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("JsonFileStore: loaded {}", self.path.display());
        Ok(cfg)
    }

    fn save(&mut self, config: &BmsConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string(config).map_err(|_| ConfigError::IoError)?;
        std::fs::write(&self.path, text).map_err(|_| ConfigError::IoError)
    }
}
