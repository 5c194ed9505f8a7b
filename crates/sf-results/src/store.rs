//! On-disk run cache.
//!
//! Layout: `<root>/<run_id>/manifest.json` plus `<root>/<run_id>/snapshots.jsonl`,
//! one JSON snapshot per line.

use crate::result::{ResultStore, SimulationResult};
use crate::types::{RunManifest, StepSnapshot};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

/// RFC 3339 UTC timestamp for run manifests.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store under `.surgeflow/runs` next to a network document.
    pub fn for_document(document_path: &Path) -> ResultsResult<Self> {
        let document_dir = document_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: format!("{} has no parent directory", document_path.display()),
            })?;
        Self::new(document_dir.join(".surgeflow").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, result: &SimulationResult) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        let mut content = String::new();
        for snapshot in result.snapshots() {
            content.push_str(&serde_json::to_string(snapshot)?);
            content.push('\n');
        }
        fs::write(run_dir.join("snapshots.jsonl"), content)?;

        tracing::debug!(run_id = %manifest.run_id, snapshots = result.snapshots().len(), "run saved");
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");
        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_snapshots(&self, run_id: &str) -> ResultsResult<Vec<StepSnapshot>> {
        let path = self.run_dir(run_id).join("snapshots.jsonl");
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        let mut snapshots = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                snapshots.push(serde_json::from_str(line)?);
            }
        }
        Ok(snapshots)
    }

    /// Manifest and full result of a stored run.
    ///
    /// Snapshots are replayed through [`ResultStore`], so a cache that no
    /// longer matches its manifest is reported instead of loaded.
    pub fn load_run(&self, run_id: &str) -> ResultsResult<(RunManifest, SimulationResult)> {
        let manifest = self.load_manifest(run_id)?;
        let snapshots = self.load_snapshots(run_id)?;
        let mut store = ResultStore::new(manifest.layout.clone(), manifest.dt_s);
        for (line, snapshot) in snapshots.into_iter().enumerate() {
            store
                .push(snapshot)
                .map_err(|source| ResultsError::CorruptRun {
                    run_id: run_id.to_string(),
                    line: line + 1,
                    source: Box::new(source),
                })?;
        }
        let result = store.finish(manifest.status.clone());
        Ok((manifest, result))
    }

    /// Runs of one network, oldest first.
    pub fn list_runs(&self, network_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        if !self.root_dir.exists() {
            return Ok(runs);
        }
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.network_name == network_name
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
