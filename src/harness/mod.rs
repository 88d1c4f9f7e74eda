pub mod assert;
pub mod types;

pub use assert::{assert_outcome, assert_snapshot, check_snapshot};
pub use types::{Registry, Scenario};
