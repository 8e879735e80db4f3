use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

/// Directory layout of a project root. Construction creates any missing
/// directory, so it is safe to build one per run.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    raw: PathBuf,
    processed: PathBuf,
    external: PathBuf,
    reports: PathBuf,
    logs: PathBuf,
}

impl ProjectPaths {
    pub fn new(config: &Config) -> Result<Self> {
        let paths = Self {
            raw: config.raw_data_dir.clone(),
            processed: config.processed_data_dir.clone(),
            external: config.external_data_dir.clone(),
            reports: config.reports_dir.clone(),
            logs: config.logs_dir.clone(),
        };
        paths.ensure_directories()?;
        Ok(paths)
    }

    fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.raw,
            &self.processed,
            &self.external,
            &self.reports,
            &self.logs,
        ] {
            fs::create_dir_all(dir)?;
            debug!(dir = %dir.display(), "directory ready");
        }
        Ok(())
    }

    pub fn raw_data(&self) -> &Path {
        &self.raw
    }

    pub fn processed_data(&self) -> &Path {
        &self.processed
    }

    pub fn reports(&self) -> &Path {
        &self.reports
    }

    pub fn logs(&self) -> &Path {
        &self.logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_all_directories_idempotently() {
        let dir = tempdir().unwrap();
        let config = Config::with_base_path(dir.path());

        let paths = ProjectPaths::new(&config).unwrap();
        ProjectPaths::new(&config).unwrap();

        assert!(paths.raw_data().is_dir());
        assert!(paths.processed_data().is_dir());
        assert!(dir.path().join("data").join("external").is_dir());
        assert!(paths.reports().is_dir());
        assert!(paths.logs().is_dir());
    }
}
