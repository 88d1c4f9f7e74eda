//! Scenario execution across workers, and the per-run report.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::artifacts::ArtifactDir;
use crate::harness::Registry;
use crate::snapshot::{
    BaselineStore, EngineError, FailureReason, Outcome, OutcomeStatus, RunMode, SnapshotEngine,
    SnapshotResult, TestIdentity, write_json,
};

/// Reported result of one executed (scenario, configuration) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub identity: TestIdentity,

    pub status: OutcomeStatus,

    /// Set when `status` is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,

    /// Set when `status` is `error` (e.g., "render_failure")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Human-readable detail for failures and errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatched_pixel_fraction: Option<f64>,

    /// Where the diff image was written, if one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_image_path: Option<PathBuf>,
}

impl ScenarioRecord {
    /// Summarize an outcome without touching the filesystem
    pub fn from_outcome(identity: TestIdentity, outcome: &Outcome) -> Self {
        let (reason, error_kind, message) = match outcome {
            Outcome::Failed { reason, .. } => (Some(reason.clone()), None, Some(reason.to_string())),
            Outcome::Error(err) => (None, Some(err.kind().to_string()), Some(err.to_string())),
            _ => (None, None, None),
        };
        Self {
            identity,
            status: outcome.status(),
            reason,
            error_kind,
            message,
            mismatched_pixel_fraction: outcome.mismatched_pixel_fraction(),
            diff_image_path: None,
        }
    }

    /// A record for an identity that never reached the engine
    pub fn error(identity: TestIdentity, err: &EngineError) -> Self {
        Self::failed_with(identity, err.kind(), err.to_string())
    }

    fn failed_with(identity: TestIdentity, kind: &str, message: String) -> Self {
        Self {
            identity,
            status: OutcomeStatus::Error,
            reason: None,
            error_kind: Some(kind.to_string()),
            message: Some(message),
            mismatched_pixel_fraction: None,
            diff_image_path: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Passed | OutcomeStatus::Recorded)
    }
}

/// Turn an outcome into a record, writing its diff image when there is one.
///
/// A diff that cannot be written is logged; the outcome stands.
pub fn record_outcome(
    identity: TestIdentity,
    outcome: &Outcome,
    artifacts: Option<&ArtifactDir>,
) -> ScenarioRecord {
    let mut record = ScenarioRecord::from_outcome(identity, outcome);
    if let (Some(diff), Some(artifacts)) = (outcome.diff_image(), artifacts) {
        match artifacts.write_diff(&record.identity, diff) {
            Ok(path) => record.diff_image_path = Some(path),
            Err(e) => warn!(identity = %record.identity, error = %e, "could not write diff image"),
        }
    }
    record
}

/// Counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub recorded: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub host: Option<String>,
    /// One record per executed pair, sorted by identity
    pub records: Vec<ScenarioRecord>,
}

impl RunReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            started_at: Utc::now(),
            host: hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
            records: Vec::new(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.records.len(),
            ..Default::default()
        };
        for record in &self.records {
            match record.status {
                OutcomeStatus::Recorded => summary.recorded += 1,
                OutcomeStatus::Passed => summary.passed += 1,
                OutcomeStatus::Failed => summary.failed += 1,
                OutcomeStatus::Error => summary.errors += 1,
            }
        }
        summary
    }

    /// `true` when every record passed or was recorded
    pub fn success(&self) -> bool {
        self.records.iter().all(ScenarioRecord::is_success)
    }

    /// Process exit code: 0 on success, 1 if anything failed or errored
    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> SnapshotResult<()> {
        write_json(path, self)
    }
}

/// Execute every (scenario, configuration) pair of `registry`.
///
/// Pairs run on blocking worker threads, at most `workers` at a time. Every
/// pair yields exactly one record, whatever happens to it: identities that
/// appear more than once in the registry are rejected up front, and a
/// panicking renderer becomes an error record.
pub async fn run_scenarios<S>(
    engine: Arc<SnapshotEngine<S>>,
    registry: &Registry,
    artifacts: Option<ArtifactDir>,
    workers: usize,
) -> RunReport
where
    S: BaselineStore + 'static,
{
    let mut report = RunReport::new(engine.mode());
    let duplicates: HashSet<TestIdentity> = registry.duplicate_identities().into_iter().collect();
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<tokio::task::Id, TestIdentity> = HashMap::new();

    info!(mode = %engine.mode(), scenarios = registry.len(), workers, "starting run");

    for scenario in registry.scenarios() {
        for (identity, config) in scenario.cases() {
            if duplicates.contains(&identity) {
                let err = EngineError::DuplicateIdentity(identity.to_string());
                error!(%identity, "identity registered more than once");
                report.records.push(ScenarioRecord::error(identity, &err));
                continue;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let engine = Arc::clone(&engine);
            let view = Arc::clone(&scenario.view);
            let config = config.clone();
            let artifacts = artifacts.clone();
            let task_identity = identity.clone();
            let handle = tasks.spawn_blocking(move || {
                let _permit = permit;
                let outcome = engine.execute(view.as_ref(), &config, &task_identity);
                record_outcome(task_identity, &outcome, artifacts.as_ref())
            });
            pending.insert(handle.id(), identity);
        }
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, record)) => {
                pending.remove(&id);
                report.records.push(record);
            }
            Err(join_err) => {
                if let Some(identity) = pending.remove(&join_err.id()) {
                    error!(%identity, error = %join_err, "scenario task did not complete");
                    report.records.push(ScenarioRecord::failed_with(
                        identity,
                        "panic",
                        format!("scenario task did not complete: {}", join_err),
                    ));
                }
            }
        }
    }

    report.records.sort_by(|a, b| a.identity.cmp(&b.identity));
    let summary = report.summary();
    info!(
        total = summary.total,
        recorded = summary.recorded,
        passed = summary.passed,
        failed = summary.failed,
        errors = summary.errors,
        "run finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Image, PixelFormat};

    fn identity(case: &str) -> TestIdentity {
        TestIdentity::new("Suite", case, "cfg")
    }

    #[test]
    fn test_record_from_failed_outcome() {
        let outcome = Outcome::Failed {
            reason: FailureReason::BaselineMissing,
            mismatched_pixel_fraction: None,
            diff_image: None,
        };
        let record = ScenarioRecord::from_outcome(identity("a"), &outcome);
        assert_eq!(record.status, OutcomeStatus::Failed);
        assert_eq!(record.reason, Some(FailureReason::BaselineMissing));
        assert!(record.message.unwrap().contains("record mode"));
    }

    #[test]
    fn test_error_record() {
        let err = EngineError::DuplicateIdentity("Suite/a/cfg".into());
        let record = ScenarioRecord::error(identity("a"), &err);
        assert_eq!(record.status, OutcomeStatus::Error);
        assert_eq!(record.error_kind.as_deref(), Some("duplicate_identity"));
        assert!(!record.is_success());
    }

    #[test]
    fn test_record_outcome_writes_diff() {
        let tmp = tempfile::tempdir().unwrap();
        let artifacts = ArtifactDir::new(tmp.path());
        let outcome = Outcome::Failed {
            reason: FailureReason::ContentMismatch,
            mismatched_pixel_fraction: Some(0.5),
            diff_image: Some(Image::solid(2, 2, PixelFormat::Rgba8, [255, 0, 255, 255])),
        };
        let record = record_outcome(identity("a"), &outcome, Some(&artifacts));
        let path = record.diff_image_path.expect("diff written");
        assert!(path.exists());
        assert_eq!(record.mismatched_pixel_fraction, Some(0.5));
    }

    #[test]
    fn test_exit_code_aggregation() {
        let mut report = RunReport::new(RunMode::Verify);
        assert_eq!(report.exit_code(), 0);

        report
            .records
            .push(ScenarioRecord::from_outcome(identity("a"), &Outcome::Recorded));
        report.records.push(ScenarioRecord::from_outcome(
            identity("b"),
            &Outcome::Passed {
                mismatched_pixel_fraction: 0.0,
            },
        ));
        assert_eq!(report.exit_code(), 0);

        report.records.push(ScenarioRecord::from_outcome(
            identity("c"),
            &Outcome::Error(EngineError::RenderFailure("x".into())),
        ));
        assert_eq!(report.exit_code(), 1);
        let summary = report.summary();
        assert_eq!((summary.total, summary.recorded, summary.passed, summary.errors), (3, 1, 1, 1));
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = RunReport::new(RunMode::Record);
        report
            .records
            .push(ScenarioRecord::from_outcome(identity("a"), &Outcome::Recorded));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "record");
        assert_eq!(json["records"][0]["status"], "recorded");
        assert!(json["records"][0].get("diff_image_path").is_none());
    }
}
