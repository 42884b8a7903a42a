//! Recursive scan of the models directory.

use crate::discovery::path::{has_artifact_extension, ArtifactPath};
use crate::discovery::shards::collapse_shards;
use crate::error::{Result, SyncError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// Validated, de-duplicated artifacts in lexicographic order
    pub artifacts: Vec<ArtifactPath>,
    /// Candidates that failed validation, as found
    pub rejected: Vec<String>,
    /// Subdirectories or entries that could not be read
    pub unreadable: usize,
}

/// Scans a directory tree for GGUF artifacts.
#[derive(Debug, Clone)]
pub struct ModelDiscovery {
    root: PathBuf,
    collapse_shards: bool,
}

impl ModelDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            collapse_shards: true,
        }
    }

    /// Report every shard of a split model instead of only the first.
    pub fn keep_shards(mut self) -> Self {
        self.collapse_shards = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root recursively and collect artifacts.
    ///
    /// Fails with [`SyncError::DirectoryNotFound`], [`SyncError::NotADirectory`]
    /// or [`SyncError::PermissionDenied`] when the root itself is unusable.
    /// Unreadable entries below the root are logged and skipped.
    pub fn scan(&self) -> Result<ScanResult> {
        self.check_root()?;
        info!("Scanning {} for models", self.root.display());

        let mut candidates = Vec::new();
        let mut unreadable = 0;

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    unreadable += 1;
                    continue;
                }
            };

            let is_file = entry.file_type().is_file()
                || (entry.file_type().is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if !has_artifact_extension(&file_name) {
                continue;
            }

            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            match relative.to_str() {
                Some(rel) => candidates.push(rel.to_string()),
                None => {
                    warn!("Skipping non UTF-8 path: {}", relative.display());
                    unreadable += 1;
                }
            }
        }

        let mut result = self.collect(candidates);
        result.unreadable = unreadable;
        Ok(result)
    }

    /// Validate and normalize candidate relative paths.
    ///
    /// This is the half of [`scan`](Self::scan) that does not touch the
    /// filesystem.
    pub fn collect<I, S>(&self, candidates: I) -> ScanResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut artifacts = BTreeSet::new();
        let mut rejected = Vec::new();

        for candidate in candidates {
            let candidate = candidate.as_ref();
            match ArtifactPath::parse(candidate) {
                Some(path) => {
                    debug!("Found artifact {}", path);
                    artifacts.insert(path);
                }
                None => {
                    warn!("SKIPPING: '{}' is not a valid model path", candidate);
                    rejected.push(candidate.to_string());
                }
            }
        }

        let mut artifacts: Vec<ArtifactPath> = artifacts.into_iter().collect();
        if self.collapse_shards {
            artifacts = collapse_shards(artifacts);
        }

        if !rejected.is_empty() {
            warn!("Skipped {} invalid model path(s)", rejected.len());
        }
        info!("Found {} model file(s)", artifacts.len());

        ScanResult {
            artifacts,
            rejected,
            unreadable: 0,
        }
    }

    fn check_root(&self) -> Result<()> {
        let metadata = match std::fs::metadata(&self.root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SyncError::DirectoryNotFound(self.root.clone()))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(SyncError::PermissionDenied(self.root.clone()))
            }
            Err(e) => return Err(SyncError::io_with_path(e, &self.root)),
        };

        if !metadata.is_dir() {
            return Err(SyncError::NotADirectory(self.root.clone()));
        }

        match std::fs::read_dir(&self.root) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(SyncError::PermissionDenied(self.root.clone()))
            }
            Err(e) => Err(SyncError::io_with_path(e, &self.root)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"GGUF").unwrap();
    }

    #[test]
    fn test_scan_recurses_and_filters_extension() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "top.gguf");
        touch(temp_dir.path(), "alpha/model-7b.gguf");
        touch(temp_dir.path(), "alpha/deep/nested/x.GGUF");
        touch(temp_dir.path(), "alpha/README.md");
        touch(temp_dir.path(), "alpha/model-7b.gguf.sha256");

        let result = ModelDiscovery::new(temp_dir.path()).scan().unwrap();
        let found: Vec<&str> = result.artifacts.iter().map(|p| p.as_str()).collect();
        assert_eq!(found, vec!["alpha/deep/nested/x.GGUF", "alpha/model-7b.gguf", "top.gguf"]);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_scan_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let result = ModelDiscovery::new(temp_dir.path()).scan().unwrap();
        assert!(result.artifacts.is_empty());
    }

    #[test]
    fn test_scan_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let err = ModelDiscovery::new(temp_dir.path().join("nope")).scan().unwrap_err();
        assert!(matches!(err, SyncError::DirectoryNotFound(_)));
        assert!(err.is_environmental());
    }

    #[test]
    fn test_scan_root_is_file() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "file.gguf");
        let err = ModelDiscovery::new(temp_dir.path().join("file.gguf"))
            .scan()
            .unwrap_err();
        assert!(matches!(err, SyncError::NotADirectory(_)));
    }

    #[test]
    fn test_collect_rejects_traversal() {
        let discovery = ModelDiscovery::new("/unused");
        let result = discovery.collect(["../../etc/passwd.gguf", "ok/model.gguf", "/abs.gguf"]);
        let found: Vec<&str> = result.artifacts.iter().map(|p| p.as_str()).collect();
        assert_eq!(found, vec!["ok/model.gguf"]);
        assert_eq!(result.rejected, vec!["../../etc/passwd.gguf", "/abs.gguf"]);
    }

    #[test]
    fn test_collect_deduplicates_normalized_paths() {
        let discovery = ModelDiscovery::new("/unused");
        let result = discovery.collect(["a/b.gguf", "a\\b.gguf", "./a/b.gguf"]);
        assert_eq!(result.artifacts.len(), 1);
    }

    #[test]
    fn test_scan_collapses_split_models() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "big/m-00001-of-00002.gguf");
        touch(temp_dir.path(), "big/m-00002-of-00002.gguf");

        let collapsed = ModelDiscovery::new(temp_dir.path()).scan().unwrap();
        assert_eq!(collapsed.artifacts.len(), 1);

        let all = ModelDiscovery::new(temp_dir.path()).keep_shards().scan().unwrap();
        assert_eq!(all.artifacts.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_includes_symlinked_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        touch(store.path(), "blob.gguf");
        std::os::unix::fs::symlink(store.path().join("blob.gguf"), temp_dir.path().join("linked.gguf"))
            .unwrap();

        let result = ModelDiscovery::new(temp_dir.path()).scan().unwrap();
        let found: Vec<&str> = result.artifacts.iter().map(|p| p.as_str()).collect();
        assert_eq!(found, vec!["linked.gguf"]);
    }

    /// Read permission on `dir` only restricts non-root users.
    #[cfg(unix)]
    fn deny_read(dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
        fs::read_dir(dir).is_err()
    }

    #[cfg(unix)]
    fn allow_read(dir: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_unreadable_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("models");
        touch(&root, "m.gguf");

        if !deny_read(&root) {
            allow_read(&root);
            return;
        }
        let result = ModelDiscovery::new(&root).scan();
        allow_read(&root);

        let err = result.unwrap_err();
        assert!(matches!(err, SyncError::PermissionDenied(_)));
        assert!(err.is_environmental());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_unreadable_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "open/a.gguf");
        touch(temp_dir.path(), "sealed/b.gguf");
        touch(temp_dir.path(), "z.gguf");
        let sealed = temp_dir.path().join("sealed");

        if !deny_read(&sealed) {
            allow_read(&sealed);
            return;
        }
        let result = ModelDiscovery::new(temp_dir.path()).scan();
        allow_read(&sealed);

        let result = result.unwrap();
        let found: Vec<&str> = result.artifacts.iter().map(|p| p.as_str()).collect();
        assert_eq!(found, vec!["open/a.gguf", "z.gguf"]);
        assert_eq!(result.unreadable, 1);
    }
}
