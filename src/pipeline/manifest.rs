use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::constants::RUN_MANIFEST_FILE;
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::RoundingPolicy;

/// Record of a successful run: what was written and its content digests.
/// Re-running against unchanged inputs yields the same `outputs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rounding: RoundingPolicy,
    pub outputs: Vec<OutputFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub dataset: String,
    pub file_name: String,
    pub rows: usize,
    pub sha256: String,
}

impl OutputFile {
    /// Describe a file that has just been written
    pub fn describe(dataset: &str, path: &Path, rows: usize) -> Result<Self> {
        Ok(Self {
            dataset: dataset.to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            rows,
            sha256: file_sha256(path)?,
        })
    }
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

impl RunManifest {
    /// Write as pretty JSON into `dir`, replacing the previous manifest
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(RUN_MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| EtlError::Persistence {
            path: path.clone(),
            source: e.into(),
        })?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn output(&self, dataset: &str) -> Option<&OutputFile> {
        self.outputs.iter().find(|o| o.dataset == dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sha256_of_known_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.csv");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_manifest_write_and_read() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("unified.csv");
        fs::write(&data, "valor\n1\n").unwrap();

        let now = Utc::now();
        let manifest = RunManifest {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            rounding: RoundingPolicy::HalfEven,
            outputs: vec![OutputFile::describe("unified", &data, 1).unwrap()],
        };
        let path = manifest.write(dir.path()).unwrap();

        let back = RunManifest::read(&path).unwrap();
        assert_eq!(back.run_id, manifest.run_id);
        assert_eq!(back.output("unified"), manifest.output("unified"));
        assert_eq!(back.output("unified").unwrap().file_name, "unified.csv");
    }
}
