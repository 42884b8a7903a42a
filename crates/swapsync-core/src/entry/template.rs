//! Default record for a newly discovered model.

use crate::config::{SyncConfig, SyncDefaults};
use crate::discovery::{ArtifactPath, KeyGenerator, ModelKey};
use crate::entry::model::ModelEntry;
use serde_yaml::Mapping;

/// Builds the canonical default entry for an artifact.
///
/// Used both for new entries and as the source of defaults when the audit
/// backfills missing fields.
#[derive(Debug, Clone)]
pub struct EntryTemplate {
    keys: KeyGenerator,
    cmd_template: String,
}

impl Default for EntryTemplate {
    fn default() -> Self {
        Self::new(KeyGenerator::default(), SyncDefaults::CMD_TEMPLATE)
    }
}

impl EntryTemplate {
    pub fn new(keys: KeyGenerator, cmd_template: impl Into<String>) -> Self {
        Self {
            keys,
            cmd_template: cmd_template.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            KeyGenerator::new(config.max_key_length),
            config.cmd_template.clone(),
        )
    }

    pub fn keys(&self) -> &KeyGenerator {
        &self.keys
    }

    /// Default entry for `path`, keyed the way [`KeyGenerator::derive`] keys it.
    ///
    /// # Examples
    ///
    /// ```
    /// use swapsync_core::discovery::ArtifactPath;
    /// use swapsync_core::entry::EntryTemplate;
    ///
    /// let path = ArtifactPath::parse("alpha/model-7b.gguf").unwrap();
    /// let entry = EntryTemplate::default().build(&path);
    /// assert_eq!(entry.name.as_deref(), Some("alpha model 7b"));
    /// assert!(entry.cmd.unwrap().contains("-m /models/alpha/model-7b.gguf"));
    /// ```
    pub fn build(&self, path: &ArtifactPath) -> ModelEntry {
        let key = self.keys.derive(path);
        self.build_for(&key, path.as_str())
    }

    /// Default entry for an existing key whose artifact path is `path`.
    pub fn build_for(&self, key: &ModelKey, path: &str) -> ModelEntry {
        ModelEntry {
            name: Some(key.display_name()),
            description: Some(format!("Auto-generated entry for {path}")),
            cmd: Some(
                self.cmd_template
                    .replace(SyncDefaults::MODEL_PATH_PLACEHOLDER, path),
            ),
            aliases: Some(Vec::new()),
            env: Some(Vec::new()),
            ttl: Some(0),
            unlisted: Some(false),
            filters: Some(Mapping::new()),
            metadata: Some(Mapping::new()),
            macros: Some(Mapping::new()),
            concurrency_limit: Some(0),
            cmd_stop: Some(String::new()),
            extra: Mapping::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::model::EntryField;

    #[test]
    fn test_build_fills_every_field() {
        let path = ArtifactPath::parse("my-awesome-model.gguf").unwrap();
        let entry = EntryTemplate::default().build(&path);

        assert_eq!(entry.name.as_deref(), Some("my awesome model"));
        assert_eq!(
            entry.description.as_deref(),
            Some("Auto-generated entry for my-awesome-model.gguf")
        );
        let cmd = entry.cmd.as_deref().unwrap();
        assert!(cmd.starts_with("/app/llama-server\n"));
        assert!(cmd.contains("-m /models/my-awesome-model.gguf"));
        assert!(cmd.contains("--port ${PORT}"));
        assert!(entry.missing_fields().is_empty());
        assert!(entry.extra.is_empty());
        for field in EntryField::ALL {
            assert!(entry.has(field));
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let path = ArtifactPath::parse("org/repo/model-q4_k_m.gguf").unwrap();
        let template = EntryTemplate::default();
        assert_eq!(template.build(&path), template.build(&path));
    }

    #[test]
    fn test_extension_fields_start_empty() {
        let entry = EntryTemplate::default().build(&ArtifactPath::parse("m.gguf").unwrap());
        assert_eq!(entry.aliases, Some(vec![]));
        assert_eq!(entry.env, Some(vec![]));
        assert_eq!(entry.ttl, Some(0));
        assert_eq!(entry.unlisted, Some(false));
        assert_eq!(entry.concurrency_limit, Some(0));
        assert_eq!(entry.cmd_stop.as_deref(), Some(""));
        assert!(entry.filters.unwrap().is_empty());
    }

    #[test]
    fn test_custom_command_template() {
        let template = EntryTemplate::new(KeyGenerator::default(), "llama-server -m /data/{model_path}");
        let entry = template.build(&ArtifactPath::parse("a/b.gguf").unwrap());
        assert_eq!(entry.cmd.as_deref(), Some("llama-server -m /data/a/b.gguf"));
    }
}
