use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::constants::CONFIG_FILE;
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::RoundingPolicy;

/// Settings resolved once at startup and passed by reference to whatever
/// needs a path or a policy. Nothing below `main` reads the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_path: PathBuf,
    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
    pub external_data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub rounding: RoundingPolicy,
    pub log_level: String,
}

/// Optional `ocupacion_etl.toml` overrides
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub raw_data_path: Option<PathBuf>,
    pub processed_data_path: Option<PathBuf>,
    pub external_data_path: Option<PathBuf>,
    pub reports_path: Option<PathBuf>,
    pub logs_path: Option<PathBuf>,
    pub rounding: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Defaults rooted at `base_path`
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            raw_data_dir: base_path.join("data").join("raw"),
            processed_data_dir: base_path.join("data").join("processed"),
            external_data_dir: base_path.join("data").join("external"),
            reports_dir: base_path.join("reports"),
            logs_dir: base_path.join("logs"),
            rounding: RoundingPolicy::default(),
            log_level: "info".to_string(),
            base_path,
        }
    }

    /// Resolve configuration: defaults, then the optional TOML file under
    /// the base path, then environment variables (a `.env` file is honored).
    pub fn load(base_path: Option<PathBuf>) -> Result<Self> {
        dotenv::dotenv().ok();

        let base_path = match base_path {
            Some(p) => p,
            None => env::current_dir()?,
        };
        let mut config = Self::with_base_path(base_path);

        let config_path = config.base_path.join(CONFIG_FILE);
        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| {
                EtlError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            let file_config: FileConfig = toml::from_str(&content)?;
            config.apply_file(file_config)?;
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(p) = file.raw_data_path {
            self.raw_data_dir = self.resolve(p);
        }
        if let Some(p) = file.processed_data_path {
            self.processed_data_dir = self.resolve(p);
        }
        if let Some(p) = file.external_data_path {
            self.external_data_dir = self.resolve(p);
        }
        if let Some(p) = file.reports_path {
            self.reports_dir = self.resolve(p);
        }
        if let Some(p) = file.logs_path {
            self.logs_dir = self.resolve(p);
        }
        if let Some(r) = file.rounding {
            self.rounding = r.parse()?;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup` so tests need not touch
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup("RAW_DATA_PATH") {
            self.raw_data_dir = self.resolve(PathBuf::from(p));
        }
        if let Some(p) = lookup("PROCESSED_DATA_PATH") {
            self.processed_data_dir = self.resolve(PathBuf::from(p));
        }
        if let Some(p) = lookup("REPORTS_PATH") {
            self.reports_dir = self.resolve(PathBuf::from(p));
        }
        if let Some(r) = lookup("ETL_ROUNDING") {
            self.rounding = r.parse()?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        Ok(())
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.base_path.join(path)
        }
    }
}
