//! In-memory form of the YAML config.

use crate::config::SyncDefaults;
use crate::entry::ModelTable;
use crate::entry::model::value_kind;
use crate::error::{Result, SyncError};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{debug, warn};

/// The whole config document.
///
/// Sections other than `models` are kept as parsed and written back in
/// their original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Mapping,
    models: ModelTable,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML text.
    ///
    /// Syntax errors are fatal. A document that is not a mapping, or whose
    /// `models` value is not a mapping, is reset with a warning.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| SyncError::ConfigParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
            source: Some(e),
        })?;

        let mut root = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            other => {
                warn!(
                    "Config file '{}' holds a {} instead of a mapping; starting from an empty document",
                    origin.display(),
                    value_kind(&other)
                );
                Mapping::new()
            }
        };

        let models = match root.get_mut(SyncDefaults::MODELS_SECTION) {
            None => ModelTable::new(),
            Some(Value::Mapping(mapping)) => ModelTable::from_mapping(std::mem::take(mapping)),
            Some(Value::Null) => {
                debug!("'models' section is empty");
                ModelTable::new()
            }
            Some(other) => {
                warn!(
                    "'models' section in '{}' is a {} instead of a mapping; resetting it",
                    origin.display(),
                    value_kind(other)
                );
                ModelTable::new()
            }
        };
        if let Some(slot) = root.get_mut(SyncDefaults::MODELS_SECTION) {
            *slot = Value::Mapping(Mapping::new());
        }

        Ok(Self { root, models })
    }

    pub fn models(&self) -> &ModelTable {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelTable {
        &mut self.models
    }

    /// A top-level section other than `models`.
    pub fn section(&self, name: &str) -> Option<&Value> {
        if name == SyncDefaults::MODELS_SECTION {
            return None;
        }
        self.root.get(name)
    }

    /// Serialize to YAML text.
    ///
    /// The emitter writes multi-line strings as `|` blocks when a block can
    /// hold them exactly, and falls back to a quoted scalar otherwise (for
    /// example with trailing spaces or `\r`). String contents are never
    /// altered.
    pub fn to_yaml(&self) -> Result<String> {
        let models = self.models.to_mapping()?;

        let mut root = self.root.clone();
        root.insert(
            Value::String(SyncDefaults::MODELS_SECTION.to_string()),
            Value::Mapping(models),
        );

        let text = serde_yaml::to_string(&Value::Mapping(root))?;

        // Validate by re-parsing before anything touches disk.
        serde_yaml::from_str::<Value>(&text).map_err(|e| SyncError::Yaml {
            message: format!("Serialized config failed validation: {}", e),
            source: Some(e),
        })?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ModelKey;
    use crate::entry::{EntrySlot, ModelEntry};

    fn parse(text: &str) -> Result<ConfigDocument> {
        ConfigDocument::parse(text, Path::new("config.yaml"))
    }

    #[test]
    fn test_empty_text_is_empty_document() {
        let doc = parse("").unwrap();
        assert!(doc.models().is_empty());
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let err = parse("models: [unclosed\n").unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_non_mapping_document_is_reset() {
        let doc = parse("- just\n- a list\n").unwrap();
        assert!(doc.models().is_empty());
        assert!(doc.section("just").is_none());
    }

    #[test]
    fn test_non_mapping_models_is_reset_but_other_sections_kept() {
        let doc = parse("healthCheckTimeout: 60\nmodels: [a, b]\n").unwrap();
        assert!(doc.models().is_empty());
        assert_eq!(doc.section("healthCheckTimeout"), Some(&Value::Number(60.into())));
    }

    #[test]
    fn test_other_sections_round_trip_in_place() {
        let text = "healthCheckTimeout: 60\nmodels:\n  a:\n    name: A\ngroups:\n  g1:\n    members: [a]\n";
        let doc = parse(text).unwrap();
        let out = doc.to_yaml().unwrap();

        let keys: Vec<String> = serde_yaml::from_str::<Mapping>(&out)
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str().map(String::from))
            .collect();
        assert_eq!(keys, vec!["healthCheckTimeout", "models", "groups"]);

        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_models_section_appended_when_absent() {
        let mut doc = parse("logLevel: info\n").unwrap();
        doc.models_mut()
            .insert(ModelKey::new("m"), EntrySlot::Valid(ModelEntry::default()));
        let out: Mapping = serde_yaml::from_str(&doc.to_yaml().unwrap()).unwrap();
        let keys: Vec<&str> = out.keys().filter_map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["logLevel", "models"]);
    }

    #[test]
    fn test_multiline_cmd_is_written_as_block() {
        let mut doc = ConfigDocument::new();
        let entry = ModelEntry {
            cmd: Some("/app/llama-server\n  -m /models/x.gguf\n  --port ${PORT}".into()),
            ..ModelEntry::default()
        };
        doc.models_mut().insert(ModelKey::new("x"), EntrySlot::Valid(entry.clone()));

        let out = doc.to_yaml().unwrap();
        assert!(out.contains("cmd: |"), "expected a literal block in:\n{out}");

        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed.models().get("x").and_then(EntrySlot::as_entry), Some(&entry));
    }

    #[test]
    fn test_awkward_multiline_strings_keep_their_content() {
        let cases = [
            "run \\  \n  --flag x  ",
            "/app/llama-server  \r\n  -m /models/x.gguf\n",
            "line one\n\tindented\n\n",
            "  leading spaces\nsecond",
        ];
        for cmd in cases {
            let mut doc = ConfigDocument::new();
            let entry = ModelEntry {
                cmd: Some(cmd.to_string()),
                cmd_stop: Some(cmd.to_string()),
                ..ModelEntry::default()
            };
            doc.models_mut().insert(ModelKey::new("m"), EntrySlot::Valid(entry.clone()));

            let reparsed = parse(&doc.to_yaml().unwrap()).unwrap();
            assert_eq!(
                reparsed.models().get("m").and_then(EntrySlot::as_entry),
                Some(&entry),
                "content changed for {cmd:?}"
            );
        }
    }
}
