//! Where a collection lives on disk: `inventa.db` plus optional `inventa.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use inventa_io::Store;
use inventa_recon::{Collection, EngineConfig};

use crate::CliError;

pub const STORE_FILE: &str = "inventa.db";
pub const CONFIG_FILE: &str = "inventa.toml";

pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// `--data-dir` / `INVENTA_DATA_DIR` when given, else the platform data dir.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let root = explicit.unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("inventa")
        });
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_path(&self) -> PathBuf {
        self.root.join(STORE_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Missing config file means defaults.
    pub fn load_config(&self) -> Result<EngineConfig, CliError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
        log::debug!("loading config {}", path.display());
        EngineConfig::from_toml(&raw)
            .map_err(|e| CliError::from(e).with_hint(format!("check {}", path.display())))
    }

    pub fn open_store(&self) -> Result<Store, CliError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| CliError::io(format!("{}: {e}", self.root.display())))?;
        Ok(Store::open(&self.store_path())?)
    }

    /// Open the store and rebuild the collection it holds.
    pub fn open(&self) -> Result<(Store, Collection), CliError> {
        let config = self.load_config()?;
        let store = self.open_store()?;
        let collection = store.load_collection(config)?;
        Ok((store, collection))
    }
}
