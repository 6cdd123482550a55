//! Output directory setup and collision-free file naming.

use std::path::{Path, PathBuf};

use super::sink::StorageError;

/// Create both output directories, failing loudly if either cannot be
/// established. Acquisition must not start without them.
pub fn ensure_output_dirs(data_dir: &Path, images_dir: &Path) -> Result<(), StorageError> {
    for dir in [data_dir, images_dir] {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Pick an unused path in `dir`: `base.ext`, then `base_1.ext`, `base_2.ext`,
/// and so on until a free name is found.
///
/// Check-then-create is inherently racy when concurrent runs share a
/// directory. That race is an accepted, documented limitation of this naming
/// scheme — single-operator bench deployments do not hit it.
pub fn unique_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{base}.{ext}"));
    let mut i = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{base}_{i}.{ext}"));
        i += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirs_are_created_recursively() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let data = tmp.path().join("out/data");
        let images = tmp.path().join("out/images");
        ensure_output_dirs(&data, &images).expect("dirs created");
        assert!(data.is_dir());
        assert!(images.is_dir());
        // Second call on existing dirs is fine.
        ensure_output_dirs(&data, &images).expect("idempotent");
    }

    #[test]
    fn numeric_suffix_avoids_existing_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path();

        let first = unique_path(dir, "test", "csv");
        assert_eq!(first, dir.join("test.csv"));
        std::fs::write(&first, b"").expect("write first");

        let second = unique_path(dir, "test", "csv");
        assert_eq!(second, dir.join("test_1.csv"));
        std::fs::write(&second, b"").expect("write second");

        let third = unique_path(dir, "test", "csv");
        assert_eq!(third, dir.join("test_2.csv"));
    }
}
