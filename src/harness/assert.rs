//! Test-side entry point: snapshot a view from inside an ordinary `#[test]`.

use std::sync::OnceLock;

use crate::artifacts::ArtifactDir;
use crate::config;
use crate::runner::record_outcome;
use crate::snapshot::{
    CaptureConfiguration, FsBaselineStore, Outcome, Renderable, SnapshotEngine, TestIdentity,
};

static ENGINE: OnceLock<SnapshotEngine<FsBaselineStore>> = OnceLock::new();

/// Process-wide engine over the configured baseline root and run mode
pub fn engine() -> &'static SnapshotEngine<FsBaselineStore> {
    ENGINE.get_or_init(|| {
        let config = config::get();
        SnapshotEngine::new(
            FsBaselineStore::new(config.storage.baseline_dir.clone()),
            config.run_mode,
        )
    })
}

/// Execute one scenario against the process-wide engine
pub fn check_snapshot(
    view: &dyn Renderable,
    config: &CaptureConfiguration,
    suite: &str,
    case: &str,
) -> Outcome {
    let identity = TestIdentity::for_configuration(suite, case, config);
    engine().execute(view, config, &identity)
}

/// Snapshot `view` under `config` and panic unless it was recorded or passed.
///
/// Diff images for failures land in the configured diff directory and the
/// panic message names the file.
///
/// ```rust,no_run
/// use snapshot_regress::harness::assert_snapshot;
/// use snapshot_regress::snapshot::{Canvas, CaptureConfiguration, DeviceProfile};
///
/// let mut card = Canvas::new(300, 120);
/// card.draw_text(8, 8, "Total Sales", 2, [20, 20, 20]);
/// assert_snapshot(&card, &CaptureConfiguration::new(DeviceProfile::fixed(300, 120)), "Cards", "Total Sales");
/// ```
#[track_caller]
pub fn assert_snapshot(view: &dyn Renderable, config: &CaptureConfiguration, suite: &str, case: &str) {
    let identity = TestIdentity::for_configuration(suite, case, config);
    let outcome = engine().execute(view, config, &identity);
    let artifacts = ArtifactDir::new(config::diff_dir());
    assert_outcome(identity, &outcome, &artifacts);
}

/// Panic with an actionable message unless `outcome` is a success
#[track_caller]
pub fn assert_outcome(identity: TestIdentity, outcome: &Outcome, artifacts: &ArtifactDir) {
    if outcome.is_success() {
        return;
    }
    let record = record_outcome(identity, outcome, Some(artifacts));
    let mut message = format!(
        "snapshot '{}' {:?}: {}",
        record.identity,
        record.status,
        record.message.as_deref().unwrap_or("unknown error")
    );
    if let Some(fraction) = record.mismatched_pixel_fraction {
        message.push_str(&format!(" ({:.2}% of pixels differ)", fraction * 100.0));
    }
    if let Some(path) = &record.diff_image_path {
        message.push_str(&format!("\n  diff: {}", path.display()));
    }
    message.push_str(&format!(
        "\n  re-record with {}=1 if the change is intended",
        config::ENV_RECORD
    ));
    panic!("{}", message);
}
