use crate::error::{FlujoError, Result};
use std::path::PathBuf;
use xdg::BaseDirectories;

pub const DB_ENV: &str = "FLUJO_DB";
pub const RULES_ENV: &str = "FLUJO_RULES";
pub const DEFAULT_RULES_FILE: &str = "clasificadores.toml";

pub struct Config {
    pub db_path: PathBuf,
    pub rules_path: Option<PathBuf>,
}

impl Config {
    /// Resolve paths: explicit override, then environment, then XDG dirs.
    pub fn new(db_override: Option<PathBuf>, rules_override: Option<PathBuf>) -> Result<Self> {
        let db_path = if let Some(path) = db_override {
            path
        } else if let Ok(env_path) = std::env::var(DB_ENV) {
            PathBuf::from(env_path)
        } else {
            let xdg = BaseDirectories::with_prefix("flujo")
                .map_err(|e| FlujoError::Config(format!("Failed to initialize XDG directories: {}", e)))?;
            xdg.place_data_file("flujo.db")
                .map_err(|e| FlujoError::Config(format!("Failed to create data directory: {}", e)))?
        };

        let rules_path = rules_override
            .or_else(|| std::env::var(RULES_ENV).ok().map(PathBuf::from))
            .or_else(|| {
                BaseDirectories::with_prefix("flujo")
                    .ok()
                    .and_then(|xdg| xdg.find_config_file(DEFAULT_RULES_FILE))
            });

        Ok(Self {
            db_path,
            rules_path,
        })
    }

    pub fn ensure_db_directory(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
