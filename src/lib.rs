//! Snapshot Regress - visual regression testing with recorded baselines.
//!
//! This crate provides:
//! - A snapshot engine that records or verifies rendered views
//! - A pixel comparator with precision and per-channel tolerance
//! - A filesystem baseline store with atomic writes
//! - A parallel scenario runner with JSON reports and diff artifacts
//! - A software canvas and a small demo app to capture
//!
//! # Example
//!
//! ```rust,no_run
//! use snapshot_regress::snapshot::{
//!     Canvas, CaptureConfiguration, DeviceProfile, FsBaselineStore, RunMode, SnapshotEngine, TestIdentity,
//! };
//!
//! let engine = SnapshotEngine::new(FsBaselineStore::new("__snapshots__"), RunMode::from_env());
//! let config = CaptureConfiguration::new(DeviceProfile::fixed(300, 120));
//! let mut card = Canvas::new(300, 120);
//! card.draw_text(8, 8, "Total Sales", 2, [255, 255, 255]);
//!
//! let identity = TestIdentity::for_configuration("Cards", "Total Sales", &config);
//! let outcome = engine.execute(&card, &config, &identity);
//! assert!(outcome.is_success(), "{:?}", outcome);
//! ```

pub mod artifacts;
pub mod config;
pub mod demo;
pub mod harness;
pub mod runner;
pub mod snapshot;

// Re-export runner types
pub use runner::{RunReport, RunSummary, ScenarioRecord, run_scenarios};

// Re-export harness types
pub use harness::{Registry, Scenario, assert_snapshot};

// Re-export the core
pub use snapshot::{
    CaptureConfiguration, ComparisonResult, EngineError, Image, Outcome, Renderable, RunMode,
    SnapshotEngine, SnapshotResult, TestIdentity, compare,
};

// Re-export artifact management
pub use artifacts::ArtifactDir;
