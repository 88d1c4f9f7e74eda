use chrono::Utc;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::snapshot::types::{EngineError, SnapshotResult, TestIdentity};

/// Generate a timestamp string in YYYYMMDD_HHMMSS format
pub fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Encode one identity field as a single path component.
///
/// `[A-Za-z0-9_-.]` pass through; every other byte, and a leading `.`,
/// becomes `~XX`. The mapping is injective and never yields `.`, `..` or a
/// separator, so keys cannot collide or escape the storage root.
pub fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, byte) in raw.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-') || (byte == b'.' && i > 0);
        if keep {
            out.push(byte as char);
        } else {
            let _ = write!(out, "~{:02X}", byte);
        }
    }
    out
}

/// Relative location for an identity: `<suite>/<case>/<configuration><suffix>`
pub fn identity_path(identity: &TestIdentity, suffix: &str) -> PathBuf {
    PathBuf::from(escape_component(&identity.suite_name))
        .join(escape_component(&identity.case_name))
        .join(format!("{}{}", escape_component(&identity.configuration_key), suffix))
}

/// Pretty-print `value` as JSON into `path`, creating parent directories
pub fn write_json(path: &Path, value: &impl Serialize) -> SnapshotResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EngineError::storage(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::storage(path, std::io::Error::other(e)))?;
    fs::write(path, json).map_err(|e| EngineError::storage(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_passes_safe_names() {
        assert_eq!(escape_component("ContentView_dark-1.2"), "ContentView_dark-1.2");
    }

    #[test]
    fn test_escape_unsafe_bytes() {
        assert_eq!(escape_component("a b"), "a~20b");
        assert_eq!(escape_component("a/b"), "a~2Fb");
        assert_eq!(escape_component(".."), "~2E.");
        assert_eq!(escape_component(".diffs"), "~2Ediffs");
        assert_eq!(escape_component("~"), "~7E");
    }

    #[test]
    fn test_escape_is_injective_on_lookalikes() {
        let names = ["a b", "a_b", "a~20b", "a/b", "a\\b"];
        let escaped: std::collections::HashSet<_> = names.iter().map(|n| escape_component(n)).collect();
        assert_eq!(escaped.len(), names.len());
    }

    #[test]
    fn test_identity_path_is_deterministic() {
        let id = TestIdentity::new("Working Tests", "Dashboard View", "iphone-8-light-en_US");
        let path = identity_path(&id, ".png");
        assert_eq!(
            path,
            PathBuf::from("Working~20Tests")
                .join("Dashboard~20View")
                .join("iphone-8-light-en_US.png")
        );
        assert_eq!(path, identity_path(&id.clone(), ".png"));
    }

    #[test]
    fn test_generate_timestamp_shape() {
        let ts = generate_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
    }
}
