//! Validation of relative artifact paths.
//!
//! Every path must pass through [`ArtifactPath::parse`] before a key is
//! derived from it; this is the only guard against traversal or malformed
//! names reaching the config.

use crate::config::SyncDefaults;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// A validated, POSIX-normalized path relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Validate and normalize a candidate relative path.
    ///
    /// Rejects empty input, `..` segments, absolute paths (including drive
    /// prefixes), and anything whose final extension is not `.gguf`. Backslashes
    /// become `/`; `.` and empty segments are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use swapsync_core::discovery::ArtifactPath;
    ///
    /// let path = ArtifactPath::parse("alpha\\./model-7b.gguf").unwrap();
    /// assert_eq!(path.as_str(), "alpha/model-7b.gguf");
    /// assert!(ArtifactPath::parse("../../etc/passwd.gguf").is_none());
    /// assert!(ArtifactPath::parse("/models/x.gguf").is_none());
    /// assert!(ArtifactPath::parse("notes.txt").is_none());
    /// ```
    pub fn parse(candidate: &str) -> Option<Self> {
        if candidate.trim().is_empty() {
            return None;
        }

        let normalized = candidate.replace('\\', "/");
        if normalized.starts_with('/') || has_drive_prefix(&normalized) {
            return None;
        }
        if Path::new(candidate).is_absolute() {
            return None;
        }

        let mut segments = Vec::new();
        for segment in normalized.split('/') {
            match segment {
                ".." => return None,
                "" | "." => continue,
                other => segments.push(other),
            }
        }

        let file_name = segments.last()?;
        let stem = strip_artifact_extension(file_name)?;
        if stem.is_empty() {
            return None;
        }

        Some(Self(segments.join("/")))
    }

    /// The normalized path with `/` separators.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its artifact extension.
    pub fn without_extension(&self) -> &str {
        strip_artifact_extension(&self.0).unwrap_or(&self.0)
    }
}

/// Pure predicate form of [`ArtifactPath::parse`].
pub fn validate(candidate: &str) -> bool {
    ArtifactPath::parse(candidate).is_some()
}

/// Whether `file_name` carries the artifact extension (case-insensitive).
pub fn has_artifact_extension(file_name: &str) -> bool {
    strip_artifact_extension(file_name).is_some()
}

/// Strip one trailing `.gguf` (any case), returning `None` if absent.
fn strip_artifact_extension(name: &str) -> Option<&str> {
    let suffix_len = SyncDefaults::ARTIFACT_EXTENSION.len() + 1;
    if name.len() < suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
        return None;
    }
    let (stem, suffix) = name.split_at(name.len() - suffix_len);
    let matches = suffix.starts_with('.')
        && suffix[1..].eq_ignore_ascii_case(SyncDefaults::ARTIFACT_EXTENSION);
    matches.then_some(stem)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
