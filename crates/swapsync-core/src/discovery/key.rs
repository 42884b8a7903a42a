//! Model key derivation.
//!
//! A key is the artifact path without its extension, with `/` replaced by
//! `--`. Keys longer than the configured maximum are shortened
//! deterministically:
//!
//! 1. `<first>--<interior cut to 32 chars>--<last>`
//! 2. `<first>--<last>--<sha256[..8]>`
//! 3. as 2, with `first` and `last` cut to fit
//!
//! Two different paths that land on the same key abort the run.

use crate::config::SyncDefaults;
use crate::discovery::path::ArtifactPath;
use crate::error::{Result, SyncError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Identifier of one entry in the `models` section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelKey(String);

impl ModelKey {
    /// Wrap a key read back from an existing config.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Best-effort inverse of [`KeyGenerator::derive`] for keys with no
    /// artifact on disk: `--` becomes `/` and the extension is re-added.
    pub fn implied_path(&self) -> String {
        format!(
            "{}.{}",
            self.0.replace(SyncDefaults::KEY_DELIMITER, "/"),
            SyncDefaults::ARTIFACT_EXTENSION
        )
    }

    /// Human-readable form: delimiters, `-` and `_` become single spaces.
    pub fn display_name(&self) -> String {
        self.0
            .replace(SyncDefaults::KEY_DELIMITER, " ")
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModelKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Derives bounded, stable keys from artifact paths.
#[derive(Debug, Clone, Copy)]
pub struct KeyGenerator {
    max_len: usize,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(SyncDefaults::MAX_KEY_LENGTH)
    }
}

impl KeyGenerator {
    /// Create a generator. `max_len` below [`SyncDefaults::MIN_KEY_LENGTH`] is
    /// raised to it so the hashed form always fits.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(SyncDefaults::MIN_KEY_LENGTH),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Derive the key for one artifact.
    ///
    /// # Examples
    ///
    /// ```
    /// use swapsync_core::discovery::{ArtifactPath, KeyGenerator};
    ///
    /// let keys = KeyGenerator::default();
    /// let path = ArtifactPath::parse("alpha/model-7b.gguf").unwrap();
    /// assert_eq!(keys.derive(&path).as_str(), "alpha--model-7b");
    /// ```
    pub fn derive(&self, path: &ArtifactPath) -> ModelKey {
        let base = path
            .without_extension()
            .split('/')
            .collect::<Vec<_>>()
            .join(SyncDefaults::KEY_DELIMITER);
        ModelKey(self.shorten(&base))
    }

    /// Derive keys for a whole scan, failing on the first collision.
    ///
    /// Nothing is returned on failure, so a caller never sees a partial map.
    pub fn derive_all<'a, I>(&self, paths: I) -> Result<BTreeMap<ModelKey, ArtifactPath>>
    where
        I: IntoIterator<Item = &'a ArtifactPath>,
    {
        let mut keyed: BTreeMap<ModelKey, ArtifactPath> = BTreeMap::new();
        for path in paths {
            let key = self.derive(path);
            match keyed.entry(key) {
                Entry::Vacant(slot) => {
                    debug!("Derived key '{}' for {}", slot.key(), path);
                    slot.insert(path.clone());
                }
                Entry::Occupied(existing) => {
                    if existing.get() == path {
                        continue;
                    }
                    return Err(SyncError::KeyCollision {
                        key: existing.key().to_string(),
                        first: existing.get().to_string(),
                        second: path.to_string(),
                    });
                }
            }
        }
        Ok(keyed)
    }

    fn shorten(&self, base: &str) -> String {
        if char_len(base) <= self.max_len {
            return base.to_string();
        }

        let delimiter = SyncDefaults::KEY_DELIMITER;
        let segments: Vec<&str> = base.split(delimiter).collect();
        let digest = hash8(base);

        if segments.len() < 2 {
            // `<prefix>--<hash8>`
            let budget = self.max_len - delimiter.len() - digest.len();
            return format!("{}{}{}", take_chars(base, budget), delimiter, digest);
        }

        let first = segments[0];
        let last = segments[segments.len() - 1];

        if segments.len() > 2 {
            let interior = segments[1..segments.len() - 1].join(delimiter);
            let interior = take_chars(&interior, SyncDefaults::INTERIOR_BUDGET);
            let interior = interior.trim_end_matches('-');
            let candidate = format!("{first}{delimiter}{interior}{delimiter}{last}");
            if char_len(&candidate) <= self.max_len {
                return candidate;
            }
        }

        let hashed = format!("{first}{delimiter}{last}{delimiter}{digest}");
        if char_len(&hashed) <= self.max_len {
            return hashed;
        }

        let room = self.max_len - 2 * delimiter.len() - digest.len();
        let first_budget = room / 2;
        let last_budget = room - first_budget;
        format!(
            "{}{delimiter}{}{delimiter}{digest}",
            take_chars(first, first_budget),
            take_chars(last, last_budget)
        )
    }
}

/// First 8 hex characters of the SHA-256 of `input`.
pub fn hash8(input: &str) -> String {
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest[..SyncDefaults::HASH_SUFFIX_LEN].to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
