//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for snapshot runs:
//! - Environment variables for all configurable values
//! - Sensible defaults for local development
//! - A process-wide cache so every scenario sees the same values
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SNAPSHOT_RECORD` | Record signal; truthy selects record mode | unset (verify) |
//! | `SNAPSHOT_BASELINE_DIR` | Baseline root directory | `__snapshots__` |
//! | `SNAPSHOT_DIFF_DIR` | Diff artifact directory | `__snapshots__/.diffs` |
//! | `SNAPSHOT_PRECISION` | Default fraction of pixels that must match | `1.0` |
//! | `SNAPSHOT_TOLERANCE` | Default per-channel tolerance | `0.0` |
//! | `SNAPSHOT_WORKERS` | Parallel scenario workers | available parallelism |
//! | `SNAPSHOT_DEVICE` | Default device profile | `iphone-13-pro-max` |
//!
//! # Example
//!
//! ```bash
//! # Re-record every baseline once
//! SNAPSHOT_RECORD=1 snapshot-regress run
//!
//! # Verify with a little slack for anti-aliasing drift
//! SNAPSHOT_PRECISION=0.99 SNAPSHOT_TOLERANCE=0.02 snapshot-regress run
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::warn;

use crate::snapshot::{CaptureConfiguration, DeviceProfile, EngineError, RunMode, SnapshotResult};

// ============================================================================
// Default Values
// ============================================================================

/// Default baseline root
pub const DEFAULT_BASELINE_DIR: &str = "__snapshots__";

/// Default diff artifact directory
pub const DEFAULT_DIFF_DIR: &str = "__snapshots__/.diffs";

/// Default precision (byte-exact)
pub const DEFAULT_PRECISION: f64 = 1.0;

/// Default perceptual tolerance (byte-exact)
pub const DEFAULT_TOLERANCE: f64 = 0.0;

/// Default device profile preset
pub const DEFAULT_DEVICE: &str = "iphone-13-pro-max";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable carrying the record signal
pub const ENV_RECORD: &str = crate::snapshot::types::DEFAULT_RECORD_SIGNAL;

/// Environment variable for the baseline root
pub const ENV_BASELINE_DIR: &str = "SNAPSHOT_BASELINE_DIR";

/// Environment variable for the diff directory
pub const ENV_DIFF_DIR: &str = "SNAPSHOT_DIFF_DIR";

/// Environment variable for the default precision
pub const ENV_PRECISION: &str = "SNAPSHOT_PRECISION";

/// Environment variable for the default tolerance
pub const ENV_TOLERANCE: &str = "SNAPSHOT_TOLERANCE";

/// Environment variable for the worker count
pub const ENV_WORKERS: &str = "SNAPSHOT_WORKERS";

/// Environment variable for the default device profile
pub const ENV_DEVICE: &str = "SNAPSHOT_DEVICE";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access).
///
/// The run mode inside is therefore fixed for the life of the process.
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for snapshot runs
#[derive(Debug, Clone)]
pub struct Config {
    /// Record or verify, resolved once
    pub run_mode: RunMode,
    /// Storage locations
    pub storage: StorageSettings,
    /// Comparison and capture defaults
    pub defaults: DefaultSettings,
}

/// Where baselines and diffs live
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub baseline_dir: PathBuf,
    pub diff_dir: PathBuf,
}

/// Defaults applied to capture configurations
#[derive(Debug, Clone)]
pub struct DefaultSettings {
    pub precision: f64,
    pub perceptual_tolerance: f64,
    pub device: DeviceProfile,
    pub workers: usize,
    /// Environment values that could not be used, as `VAR=value: reason`
    pub rejected: Vec<String>,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            run_mode: RunMode::from_env_var(ENV_RECORD),
            storage: StorageSettings::from_env(),
            defaults: DefaultSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            run_mode: RunMode::Verify,
            storage: StorageSettings::defaults(),
            defaults: DefaultSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl StorageSettings {
    pub fn from_env() -> Self {
        Self {
            baseline_dir: env::var(ENV_BASELINE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_BASELINE_DIR)),
            diff_dir: env::var(ENV_DIFF_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DIFF_DIR)),
        }
    }

    pub fn defaults() -> Self {
        Self {
            baseline_dir: PathBuf::from(DEFAULT_BASELINE_DIR),
            diff_dir: PathBuf::from(DEFAULT_DIFF_DIR),
        }
    }
}

impl DefaultSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; bad values fall back to the default
    /// and are kept in `rejected` so [`DefaultSettings::validate`] fails
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut rejected = Vec::new();
        let mut reject = |name: &str, value: &str, reason: &str| {
            warn!(var = name, value, reason, "ignoring environment value");
            rejected.push(format!("{}={}: {}", name, value, reason));
        };

        let precision = match lookup(ENV_PRECISION) {
            Some(raw) => parse_unit_interval(&raw).unwrap_or_else(|| {
                reject(ENV_PRECISION, raw.as_str(), "must be a number within [0, 1]");
                DEFAULT_PRECISION
            }),
            None => DEFAULT_PRECISION,
        };
        let perceptual_tolerance = match lookup(ENV_TOLERANCE) {
            Some(raw) => parse_unit_interval(&raw).unwrap_or_else(|| {
                reject(ENV_TOLERANCE, raw.as_str(), "must be a number within [0, 1]");
                DEFAULT_TOLERANCE
            }),
            None => DEFAULT_TOLERANCE,
        };
        let device = match lookup(ENV_DEVICE) {
            Some(raw) => DeviceProfile::parse(&raw).unwrap_or_else(|| {
                reject(ENV_DEVICE, raw.as_str(), "not a preset or a renderable WxH[@S]");
                default_device()
            }),
            None => default_device(),
        };
        let workers = match lookup(ENV_WORKERS) {
            Some(raw) => raw.trim().parse().ok().filter(|&n: &usize| n > 0).unwrap_or_else(|| {
                reject(ENV_WORKERS, raw.as_str(), "must be a positive integer");
                default_workers()
            }),
            None => default_workers(),
        };

        Self {
            precision,
            perceptual_tolerance,
            device,
            workers,
            rejected,
        }
    }

    pub fn defaults() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            perceptual_tolerance: DEFAULT_TOLERANCE,
            device: default_device(),
            workers: default_workers(),
            rejected: Vec::new(),
        }
    }

    /// Fail with `InvalidConfiguration` if any environment value was rejected
    pub fn validate(&self) -> SnapshotResult<()> {
        if self.rejected.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidConfiguration(self.rejected.join("; ")))
        }
    }

    /// A capture configuration on the default device with default thresholds
    pub fn capture_configuration(&self) -> CaptureConfiguration {
        CaptureConfiguration::new(self.device.clone())
            .precision(self.precision)
            .perceptual_tolerance(self.perceptual_tolerance)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a float that must lie in [0, 1]
fn parse_unit_interval(s: &str) -> Option<f64> {
    let value: f64 = s.trim().parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

fn default_device() -> DeviceProfile {
    DeviceProfile::parse(DEFAULT_DEVICE).unwrap_or_else(DeviceProfile::iphone_13_pro_max)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Get the baseline root (convenience function)
pub fn baseline_dir() -> PathBuf {
    get().storage.baseline_dir.clone()
}

/// Get the diff directory (convenience function)
pub fn diff_dir() -> PathBuf {
    get().storage.diff_dir.clone()
}
