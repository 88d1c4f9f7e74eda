//! Diff artifact management.
//!
//! Diff images are diagnostic only: they are written next to the baselines
//! under a separate root, never read back as authoritative, and safe to
//! delete between runs. Each run leaves a `.run.json` marker describing it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::snapshot::{
    EngineError, Image, RunMode, SnapshotResult, TestIdentity, generate_timestamp, identity_path, write_json,
};

/// Name of the per-run marker file
pub const RUN_MARKER: &str = ".run.json";

/// Directory receiving diff images for a run
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    /// Root directory for diff artifacts
    pub dir: PathBuf,
}

impl ArtifactDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory, drop diffs left by earlier runs and write the
    /// run marker
    pub fn init(&self, mode: RunMode) -> SnapshotResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| EngineError::storage(&self.dir, e))?;

        let stale = self.list_diffs().map_err(|e| EngineError::storage(&self.dir, e))?;
        for path in &stale {
            fs::remove_file(path).map_err(|e| EngineError::storage(path, e))?;
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), dir = %self.dir.display(), "removed stale diffs");
        }

        let marker = serde_json::json!({
            "run_id": generate_timestamp(),
            "created": chrono::Utc::now().to_rfc3339(),
            "mode": mode,
            "host": hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
        });
        write_json(&self.dir.join(RUN_MARKER), &marker)
    }

    /// Get path for the diff image of an identity
    pub fn diff_path(&self, identity: &TestIdentity) -> PathBuf {
        self.dir.join(identity_path(identity, ".diff.png"))
    }

    /// Encode and write a diff image, returning where it went
    pub fn write_diff(&self, identity: &TestIdentity, diff: &Image) -> SnapshotResult<PathBuf> {
        let path = self.diff_path(identity);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::storage(parent, e))?;
        }
        let png = diff
            .to_png()
            .map_err(|e| EngineError::storage(&path, io::Error::other(e)))?;
        fs::write(&path, png).map_err(|e| EngineError::storage(&path, e))?;
        debug!(%identity, path = %path.display(), "wrote diff image");
        Ok(path)
    }

    /// List all diff images, sorted
    pub fn list_diffs(&self) -> io::Result<Vec<PathBuf>> {
        let mut diffs = Vec::new();
        if self.dir.exists() {
            collect_diffs(&self.dir, &mut diffs)?;
        }
        diffs.sort();
        Ok(diffs)
    }

    /// Remove the whole artifact directory
    pub fn clean(&self) -> io::Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Remove diff images older than `max_age`; returns how many went
    pub fn clean_older_than(&self, max_age: Duration) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut cleaned = 0;
        for path in self.list_diffs()? {
            let modified = fs::metadata(&path)?.modified()?;
            if now.duration_since(modified).is_ok_and(|age| age > max_age) && fs::remove_file(&path).is_ok() {
                cleaned += 1;
            }
        }
        Ok(cleaned)
    }
}

fn collect_diffs(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_diffs(&path, out)?;
        } else if path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(".diff.png"))
        {
            out.push(path);
        }
    }
    Ok(())
}
