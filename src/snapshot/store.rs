//! Durable mapping from [`TestIdentity`] to [`Baseline`].
//!
//! `FsBaselineStore` keeps one PNG per identity with a JSON sidecar:
//!
//! ```text
//! <root>/<suite>/<case>/<configuration>.png
//! <root>/<suite>/<case>/<configuration>.json
//! ```
//!
//! Both files are staged as temporary files in the destination directory
//! before either is renamed into place. The sidecar is committed first and
//! the image last; if the image cannot be committed the previous sidecar is
//! put back, so a failed `put` leaves the old baseline as it was.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::types::{Baseline, BaselineMetadata, EngineError, Image, SnapshotResult, TestIdentity};
use super::utils::identity_path;

/// Storage for baselines.
///
/// Distinct identities never share a location, so concurrent calls for
/// different identities need no coordination.
pub trait BaselineStore: Send + Sync {
    /// Read the baseline for `identity`; `Ok(None)` when none was recorded
    fn get(&self, identity: &TestIdentity) -> SnapshotResult<Option<Baseline>>;

    /// Replace the baseline for `identity` wholesale
    fn put(&self, identity: &TestIdentity, image: &Image, metadata: &BaselineMetadata) -> SnapshotResult<()>;
}

/// Baselines on the local filesystem
#[derive(Debug, Clone)]
pub struct FsBaselineStore {
    root: PathBuf,
}

impl FsBaselineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the baseline image for `identity` lives
    pub fn image_path(&self, identity: &TestIdentity) -> PathBuf {
        self.root.join(identity_path(identity, ".png"))
    }

    /// Where the metadata sidecar for `identity` lives
    pub fn metadata_path(&self, identity: &TestIdentity) -> PathBuf {
        self.root.join(identity_path(identity, ".json"))
    }

    fn read_metadata(&self, identity: &TestIdentity) -> Option<BaselineMetadata> {
        let path = self.metadata_path(identity);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "baseline metadata unreadable");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "baseline metadata malformed");
                None
            }
        }
    }
}

impl BaselineStore for FsBaselineStore {
    fn get(&self, identity: &TestIdentity) -> SnapshotResult<Option<Baseline>> {
        let path = self.image_path(identity);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%identity, path = %path.display(), "no baseline");
                return Ok(None);
            }
            Err(e) => return Err(EngineError::storage(&path, e)),
        };
        let image = Image::from_png(&bytes)
            .map_err(|e| EngineError::storage(&path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        debug!(%identity, path = %path.display(), "loaded baseline");
        Ok(Some(Baseline {
            image,
            metadata: self.read_metadata(identity),
        }))
    }

    fn put(&self, identity: &TestIdentity, image: &Image, metadata: &BaselineMetadata) -> SnapshotResult<()> {
        let path = self.image_path(identity);
        let meta_path = self.metadata_path(identity);
        let png = image
            .to_png()
            .map_err(|e| EngineError::storage(&path, io::Error::other(e)))?;
        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| EngineError::storage(&meta_path, io::Error::other(e)))?;

        let staged_png = stage(&path, &png)?;
        let staged_json = stage(&meta_path, &json)?;

        // sidecar first, image last; a failed image commit puts the old sidecar back
        let previous_json = match fs::read(&meta_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(EngineError::storage(&meta_path, e)),
        };
        staged_json
            .persist(&meta_path)
            .map_err(|e| EngineError::storage(&meta_path, e.error))?;
        if let Err(e) = staged_png.persist(&path) {
            restore_sidecar(&meta_path, previous_json.as_deref());
            return Err(EngineError::storage(&path, e.error));
        }

        debug!(%identity, path = %path.display(), bytes = png.len(), "stored baseline");
        Ok(())
    }
}

/// Write `bytes` to a temp file beside `path`, ready to be persisted over it
fn stage(path: &Path, bytes: &[u8]) -> SnapshotResult<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| EngineError::storage(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| EngineError::storage(dir, e))?;
    tmp.write_all(bytes).map_err(|e| EngineError::storage(path, e))?;
    tmp.as_file().sync_all().map_err(|e| EngineError::storage(path, e))?;
    Ok(tmp)
}

/// Put back the sidecar that belonged to the still-current image
fn restore_sidecar(meta_path: &Path, previous: Option<&[u8]>) {
    let restored = match previous {
        Some(bytes) => stage(meta_path, bytes).and_then(|tmp| {
            tmp.persist(meta_path)
                .map(|_| ())
                .map_err(|e| EngineError::storage(meta_path, e.error))
        }),
        None => fs::remove_file(meta_path).map_err(|e| EngineError::storage(meta_path, e)),
    };
    if let Err(e) = restored {
        warn!(path = %meta_path.display(), error = %e, "could not restore baseline metadata");
    }
}

/// Baselines held in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    baselines: RwLock<HashMap<TestIdentity, Baseline>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.baselines.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn get(&self, identity: &TestIdentity) -> SnapshotResult<Option<Baseline>> {
        let baselines = self.baselines.read().unwrap_or_else(PoisonError::into_inner);
        Ok(baselines.get(identity).cloned())
    }

    fn put(&self, identity: &TestIdentity, image: &Image, metadata: &BaselineMetadata) -> SnapshotResult<()> {
        let mut baselines = self.baselines.write().unwrap_or_else(PoisonError::into_inner);
        baselines.insert(
            identity.clone(),
            Baseline {
                image: image.clone(),
                metadata: Some(metadata.clone()),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::types::{CaptureConfiguration, PixelFormat};
    use tempfile::tempdir;

    fn identity() -> TestIdentity {
        TestIdentity::new("Suite", "case one", "iphone-8-light-en_US")
    }

    fn image(color: u8) -> Image {
        Image::solid(4, 3, PixelFormat::Rgb8, [color, color, color, 255])
    }

    fn metadata(img: &Image) -> BaselineMetadata {
        BaselineMetadata::capture(img, &CaptureConfiguration::default())
    }

    #[test]
    fn test_fs_missing_baseline_is_none() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        assert!(store.get(&identity()).unwrap().is_none());
    }

    #[test]
    fn test_fs_put_then_get() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        let img = image(40);
        store.put(&identity(), &img, &metadata(&img)).unwrap();

        let baseline = store.get(&identity()).unwrap().expect("stored");
        assert_eq!(baseline.image, img);
        let meta = baseline.metadata.expect("sidecar");
        assert_eq!((meta.width, meta.height), (4, 3));
        assert!(store.image_path(&identity()).starts_with(dir.path()));
    }

    #[test]
    fn test_fs_put_overwrites_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        store.put(&identity(), &image(1), &metadata(&image(1))).unwrap();
        store.put(&identity(), &image(2), &metadata(&image(2))).unwrap();

        assert_eq!(store.get(&identity()).unwrap().unwrap().image, image(2));
        let case_dir = store.image_path(&identity()).parent().unwrap().to_path_buf();
        let mut names: Vec<_> = fs::read_dir(case_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["iphone-8-light-en_US.json", "iphone-8-light-en_US.png"]);
    }

    #[test]
    fn test_fs_failed_sidecar_write_keeps_old_image() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        store.put(&identity(), &image(1), &metadata(&image(1))).unwrap();

        let meta_path = store.metadata_path(&identity());
        fs::remove_file(&meta_path).unwrap();
        fs::create_dir_all(meta_path.join("occupied")).unwrap();

        let result = store.put(&identity(), &image(2), &metadata(&image(2)));
        assert!(matches!(result, Err(EngineError::StorageFailure { .. })));
        assert_eq!(store.get(&identity()).unwrap().unwrap().image, image(1));
    }

    #[test]
    fn test_fs_failed_image_write_restores_sidecar() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        let first = Image::solid(2, 2, PixelFormat::Rgb8, [7, 7, 7, 255]);
        store.put(&identity(), &first, &metadata(&first)).unwrap();
        let old_sidecar = fs::read(store.metadata_path(&identity())).unwrap();

        let image_path = store.image_path(&identity());
        fs::remove_file(&image_path).unwrap();
        fs::create_dir_all(image_path.join("occupied")).unwrap();

        let result = store.put(&identity(), &image(2), &metadata(&image(2)));
        assert!(matches!(result, Err(EngineError::StorageFailure { .. })));
        assert_eq!(fs::read(store.metadata_path(&identity())).unwrap(), old_sidecar);
    }

    #[test]
    fn test_fs_failed_first_write_leaves_no_sidecar() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        let image_path = store.image_path(&identity());
        fs::create_dir_all(image_path.join("occupied")).unwrap();

        assert!(store.put(&identity(), &image(3), &metadata(&image(3))).is_err());
        assert!(!store.metadata_path(&identity()).exists());
    }

    #[test]
    fn test_fs_missing_sidecar_still_loads_image() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        store.put(&identity(), &image(9), &metadata(&image(9))).unwrap();
        fs::remove_file(store.metadata_path(&identity())).unwrap();

        let baseline = store.get(&identity()).unwrap().unwrap();
        assert_eq!(baseline.image, image(9));
        assert!(baseline.metadata.is_none());
    }

    #[test]
    fn test_fs_corrupt_baseline_is_storage_failure() {
        let dir = tempdir().unwrap();
        let store = FsBaselineStore::new(dir.path());
        let path = store.image_path(&identity());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"truncated").unwrap();

        assert!(matches!(
            store.get(&identity()),
            Err(EngineError::StorageFailure { .. })
        ));
    }

    #[test]
    fn test_fs_unwritable_root_is_storage_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        // root is a regular file, so no directory can be created below it
        let store = FsBaselineStore::new(&blocker);
        let result = store.put(&identity(), &image(0), &metadata(&image(0)));
        assert!(matches!(result, Err(EngineError::StorageFailure { .. })));
    }

    #[test]
    fn test_fs_same_identity_same_location_across_instances() {
        let a = FsBaselineStore::new("/baselines");
        let b = FsBaselineStore::new("/baselines");
        assert_eq!(a.image_path(&identity()), b.image_path(&identity()));
        let other = TestIdentity::new("Suite", "case_one", "iphone-8-light-en_US");
        assert_ne!(a.image_path(&identity()), a.image_path(&other));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryBaselineStore::new();
        assert!(store.is_empty());
        assert!(store.get(&identity()).unwrap().is_none());
        store.put(&identity(), &image(5), &metadata(&image(5))).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&identity()).unwrap().unwrap().image, image(5));
    }
}
