pub mod backend;
pub mod compare;
pub mod engine;
pub mod store;
pub mod types;
pub mod utils;

pub use backend::{Canvas, Renderable, ViewFn, view_fn};
pub use compare::compare;
pub use engine::SnapshotEngine;
pub use store::{BaselineStore, FsBaselineStore, MemoryBaselineStore};
pub use types::{
    Baseline, BaselineMetadata, CaptureConfiguration, ColorScheme, ComparisonResult, DeviceProfile,
    EngineError, FailureReason, Image, ImageError, Outcome, OutcomeStatus, PixelFormat, RenderError,
    RunMode, SnapshotResult, TestIdentity, Verdict,
};
pub use utils::{escape_component, generate_timestamp, identity_path, write_json};
