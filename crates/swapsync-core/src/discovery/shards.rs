//! Split GGUF detection.
//!
//! `llama-gguf-split` writes large models as `<base>-00001-of-00003.gguf`,
//! `<base>-00002-of-00003.gguf`, ... and the server loads the whole set from
//! the first file. Only that first shard should become a config entry.

use crate::discovery::path::ArtifactPath;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// `<base>-NNNNN-of-MMMMM.gguf`, captures (base, index, total).
static SPLIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+)-(\d{5})-of-(\d{5})\.gguf$").unwrap());

/// Position of one file within a split set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardInfo {
    pub index: usize,
    pub total: usize,
}

/// Parse the shard position from a path, if it follows the split naming.
pub fn shard_info(path: &ArtifactPath) -> Option<(String, ShardInfo)> {
    let caps = SPLIT_PATTERN.captures(path.as_str())?;
    let index = caps[2].parse().ok()?;
    let total = caps[3].parse().ok()?;
    Some((caps[1].to_string(), ShardInfo { index, total }))
}

/// Reduce each split set to its first shard.
///
/// A set is identified by its base name and shard count, so
/// `m-00001-of-00002` and `m-00001-of-00003` are separate sets. Unsplit files
/// pass through unchanged. Sets missing shards are logged; a set without
/// shard 1 contributes nothing since the server could not load it.
pub fn collapse_shards(paths: Vec<ArtifactPath>) -> Vec<ArtifactPath> {
    let mut sets: BTreeMap<(String, usize), Vec<(ShardInfo, ArtifactPath)>> = BTreeMap::new();
    let mut result = Vec::with_capacity(paths.len());

    for path in paths {
        match shard_info(&path) {
            Some((base, info)) => sets
                .entry((base, info.total))
                .or_default()
                .push((info, path)),
            None => result.push(path),
        }
    }

    for ((base, expected), mut shards) in sets {
        shards.sort_by_key(|(info, _)| info.index);
        let missing: Vec<usize> = (1..=expected)
            .filter(|i| !shards.iter().any(|(info, _)| info.index == *i))
            .collect();

        if !missing.is_empty() {
            warn!(
                "Split model '{}' is incomplete: missing shard(s) {:?} of {}",
                base, missing, expected
            );
        }

        match shards.iter().position(|(info, _)| info.index == 1) {
            Some(pos) => {
                let (_, first) = shards.swap_remove(pos);
                for (_, other) in &shards {
                    debug!("Skipping secondary shard {}", other);
                }
                result.push(first);
            }
            None => warn!("Split model '{}' has no first shard; skipping", base),
        }
    }

    result.sort();
    result
}
