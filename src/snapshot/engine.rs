//! Record-or-verify orchestration for a single snapshot case.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use super::backend::Renderable;
use super::compare::compare;
use super::store::BaselineStore;
use super::types::{
    BaselineMetadata, CaptureConfiguration, ComparisonResult, EngineError, FailureReason, Image,
    Outcome, RunMode, SnapshotResult, TestIdentity, Verdict,
};

/// Drives one scenario: render once, then record or verify.
///
/// The mode is fixed when the engine is built and shared by every scenario
/// it executes.
pub struct SnapshotEngine<S> {
    store: S,
    mode: RunMode,
    in_flight: Mutex<HashSet<TestIdentity>>,
}

impl<S: BaselineStore> SnapshotEngine<S> {
    pub fn new(store: S, mode: RunMode) -> Self {
        Self {
            store,
            mode,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute one scenario. Every failure is reported in the returned
    /// [`Outcome`]; nothing here panics or aborts the caller's run.
    pub fn execute(
        &self,
        view: &dyn Renderable,
        config: &CaptureConfiguration,
        identity: &TestIdentity,
    ) -> Outcome {
        match self.try_execute(view, config, identity) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%identity, kind = err.kind(), error = %err, "scenario error");
                Outcome::Error(err)
            }
        }
    }

    fn try_execute(
        &self,
        view: &dyn Renderable,
        config: &CaptureConfiguration,
        identity: &TestIdentity,
    ) -> SnapshotResult<Outcome> {
        identity.validate()?;
        config.validate()?;
        let _claim = self.claim(identity)?;

        let candidate = view
            .render(config)
            .map_err(|e| EngineError::RenderFailure(e.to_string()))?;
        debug!(%identity, width = candidate.width(), height = candidate.height(), "rendered");

        match self.mode {
            RunMode::Record => self.record(identity, config, &candidate),
            RunMode::Verify => self.verify(identity, config, &candidate),
        }
    }

    fn record(
        &self,
        identity: &TestIdentity,
        config: &CaptureConfiguration,
        candidate: &Image,
    ) -> SnapshotResult<Outcome> {
        let metadata = BaselineMetadata::capture(candidate, config);
        self.store.put(identity, candidate, &metadata)?;
        info!(%identity, "recorded baseline");
        Ok(Outcome::Recorded)
    }

    fn verify(
        &self,
        identity: &TestIdentity,
        config: &CaptureConfiguration,
        candidate: &Image,
    ) -> SnapshotResult<Outcome> {
        let Some(baseline) = self.store.get(identity)? else {
            warn!(%identity, "no baseline recorded");
            return Ok(Outcome::Failed {
                reason: FailureReason::BaselineMissing,
                mismatched_pixel_fraction: None,
                diff_image: None,
            });
        };

        let result = compare(
            candidate,
            &baseline.image,
            config.precision,
            config.perceptual_tolerance,
        );
        let outcome = outcome_from_comparison(result, candidate, &baseline.image);
        match &outcome {
            Outcome::Passed {
                mismatched_pixel_fraction,
            } => info!(%identity, fraction = mismatched_pixel_fraction, "snapshot matches"),
            Outcome::Failed { reason, .. } => warn!(%identity, %reason, "snapshot differs"),
            _ => {}
        }
        Ok(outcome)
    }

    /// Mark `identity` in flight until the returned guard drops
    fn claim(&self, identity: &TestIdentity) -> SnapshotResult<Claim<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(identity.clone()) {
            return Err(EngineError::DuplicateIdentity(identity.to_string()));
        }
        Ok(Claim {
            in_flight: &self.in_flight,
            identity: identity.clone(),
        })
    }
}

struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<TestIdentity>>,
    identity: TestIdentity,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.identity);
    }
}

fn outcome_from_comparison(result: ComparisonResult, candidate: &Image, baseline: &Image) -> Outcome {
    match result.verdict {
        Verdict::Pass => Outcome::Passed {
            mismatched_pixel_fraction: result.mismatched_pixel_fraction,
        },
        Verdict::Fail => Outcome::Failed {
            reason: FailureReason::ContentMismatch,
            mismatched_pixel_fraction: Some(result.mismatched_pixel_fraction),
            diff_image: result.diff_image,
        },
        Verdict::SizeMismatch => Outcome::Failed {
            reason: FailureReason::SizeMismatch {
                baseline: baseline.dimensions(),
                candidate: candidate.dimensions(),
            },
            mismatched_pixel_fraction: Some(result.mismatched_pixel_fraction),
            diff_image: result.diff_image,
        },
        Verdict::BaselineMissing => Outcome::Failed {
            reason: FailureReason::BaselineMissing,
            mismatched_pixel_fraction: None,
            diff_image: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::backend::{Canvas, view_fn};
    use crate::snapshot::store::MemoryBaselineStore;
    use crate::snapshot::types::{DeviceProfile, PixelFormat, RenderError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn config() -> CaptureConfiguration {
        CaptureConfiguration::new(DeviceProfile::fixed(10, 10))
    }

    fn identity() -> TestIdentity {
        TestIdentity::for_configuration("Engine", "case", &config())
    }

    fn black() -> Canvas {
        Canvas::with_color(10, 10, [0, 0, 0])
    }

    fn white() -> Canvas {
        Canvas::with_color(10, 10, [255, 255, 255])
    }

    #[test]
    fn test_record_then_verify_passes() {
        let store = MemoryBaselineStore::new();
        let recorder = SnapshotEngine::new(store, RunMode::Record);
        assert!(matches!(
            recorder.execute(&black(), &config(), &identity()),
            Outcome::Recorded
        ));

        let verifier = SnapshotEngine::new(recorder.store, RunMode::Verify);
        match verifier.execute(&black(), &config(), &identity()) {
            Outcome::Passed {
                mismatched_pixel_fraction,
            } => assert_eq!(mismatched_pixel_fraction, 0.0),
            other => panic!("expected pass, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_without_baseline_fails_and_does_not_record() {
        let engine = SnapshotEngine::new(MemoryBaselineStore::new(), RunMode::Verify);
        let outcome = engine.execute(&black(), &config(), &identity());
        assert!(matches!(
            outcome,
            Outcome::Failed {
                reason: FailureReason::BaselineMissing,
                diff_image: None,
                ..
            }
        ));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_record_overwrites_differing_baseline() {
        let engine = SnapshotEngine::new(MemoryBaselineStore::new(), RunMode::Record);
        engine.execute(&black(), &config(), &identity());
        let outcome = engine.execute(&white(), &config(), &identity());
        assert!(matches!(outcome, Outcome::Recorded));

        let stored = engine.store().get(&identity()).unwrap().unwrap();
        assert_eq!(stored.image, white().into_image());
    }

    #[test]
    fn test_verify_content_mismatch_has_diff() {
        let store = MemoryBaselineStore::new();
        let img = black().into_image();
        store
            .put(&identity(), &img, &BaselineMetadata::capture(&img, &config()))
            .unwrap();
        let engine = SnapshotEngine::new(store, RunMode::Verify);

        let outcome = engine.execute(&white(), &config(), &identity());
        match outcome {
            Outcome::Failed {
                reason: FailureReason::ContentMismatch,
                mismatched_pixel_fraction: Some(f),
                diff_image: Some(diff),
            } => {
                assert_eq!(f, 1.0);
                assert_eq!(diff.dimensions(), (10, 10));
            }
            other => panic!("expected content mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_size_mismatch() {
        let store = MemoryBaselineStore::new();
        let big = Canvas::new(20, 20).into_image();
        store
            .put(&identity(), &big, &BaselineMetadata::capture(&big, &config()))
            .unwrap();
        let engine = SnapshotEngine::new(store, RunMode::Verify);

        let outcome = engine.execute(&black(), &config(), &identity());
        assert!(matches!(
            outcome,
            Outcome::Failed {
                reason: FailureReason::SizeMismatch {
                    baseline: (20, 20),
                    candidate: (10, 10)
                },
                diff_image: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_verify_is_idempotent() {
        let store = MemoryBaselineStore::new();
        let img = black().into_image();
        store
            .put(&identity(), &img, &BaselineMetadata::capture(&img, &config()))
            .unwrap();
        let engine = SnapshotEngine::new(store, RunMode::Verify);

        let mut candidate = black();
        candidate.set_pixel(3, 3, [200, 0, 0]);
        let first = engine.execute(&candidate, &config(), &identity());
        let second = engine.execute(&candidate, &config(), &identity());
        assert_eq!(first.status(), second.status());
        assert_eq!(first.mismatched_pixel_fraction(), second.mismatched_pixel_fraction());
        assert_eq!(first.diff_image(), second.diff_image());
    }

    #[test]
    fn test_invalid_configuration_skips_render() {
        let renders = AtomicUsize::new(0);
        let view = view_fn(|_: &CaptureConfiguration| {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok(Image::solid(10, 10, PixelFormat::Rgb8, [0; 4]))
        });
        let engine = SnapshotEngine::new(MemoryBaselineStore::new(), RunMode::Record);

        let bad = config().precision(1.2);
        let outcome = engine.execute(&view, &bad, &identity());
        assert!(matches!(
            outcome,
            Outcome::Error(EngineError::InvalidConfiguration(_))
        ));

        let empty = TestIdentity::new("Engine", "", "cfg");
        assert!(matches!(
            engine.execute(&view, &config(), &empty),
            Outcome::Error(EngineError::InvalidConfiguration(_))
        ));
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_render_failure_is_surfaced_and_nothing_is_stored() {
        let view = view_fn(|_: &CaptureConfiguration| Err(RenderError::new("invalid view tree")));
        let engine = SnapshotEngine::new(MemoryBaselineStore::new(), RunMode::Record);
        match engine.execute(&view, &config(), &identity()) {
            Outcome::Error(EngineError::RenderFailure(msg)) => {
                assert!(msg.contains("invalid view tree"))
            }
            other => panic!("expected render failure, got {:?}", other),
        }
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_renders_exactly_once() {
        let renders = AtomicUsize::new(0);
        let view = view_fn(|_: &CaptureConfiguration| {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok(Image::solid(10, 10, PixelFormat::Rgb8, [0; 4]))
        });
        let engine = SnapshotEngine::new(MemoryBaselineStore::new(), RunMode::Verify);
        engine.execute(&view, &config(), &identity());
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_same_identity_is_rejected() {
        let engine = Arc::new(SnapshotEngine::new(MemoryBaselineStore::new(), RunMode::Record));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);

        let slow = Arc::new(view_fn(move |_: &CaptureConfiguration| {
            let _ = entered_tx.send(());
            let _ = release_rx
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5));
            Ok(Image::solid(10, 10, PixelFormat::Rgb8, [0; 4]))
        }));

        let first = {
            let engine = Arc::clone(&engine);
            let slow = Arc::clone(&slow);
            std::thread::spawn(move || engine.execute(slow.as_ref(), &config(), &identity()))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let second = engine.execute(&black(), &config(), &identity());
        assert!(matches!(
            second,
            Outcome::Error(EngineError::DuplicateIdentity(_))
        ));

        release_tx.send(()).unwrap();
        assert!(matches!(first.join().unwrap(), Outcome::Recorded));

        // released: a later sequential call is accepted
        assert!(matches!(
            engine.execute(&black(), &config(), &identity()),
            Outcome::Recorded
        ));
    }
}
