//! The persisted record for one model.
//!
//! Entries are read into a fixed schema with an `extra` bucket, so fields this
//! crate does not know about (or known fields holding unexpected values)
//! survive a load/save cycle untouched.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// Field names of a model entry, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryField {
    Name,
    Description,
    Cmd,
    Aliases,
    Env,
    Ttl,
    Unlisted,
    Filters,
    Metadata,
    Macros,
    ConcurrencyLimit,
    CmdStop,
}

impl EntryField {
    pub const ALL: [EntryField; 12] = [
        EntryField::Name,
        EntryField::Description,
        EntryField::Cmd,
        EntryField::Aliases,
        EntryField::Env,
        EntryField::Ttl,
        EntryField::Unlisted,
        EntryField::Filters,
        EntryField::Metadata,
        EntryField::Macros,
        EntryField::ConcurrencyLimit,
        EntryField::CmdStop,
    ];

    /// Key as it appears in the YAML document.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryField::Name => "name",
            EntryField::Description => "description",
            EntryField::Cmd => "cmd",
            EntryField::Aliases => "aliases",
            EntryField::Env => "env",
            EntryField::Ttl => "ttl",
            EntryField::Unlisted => "unlisted",
            EntryField::Filters => "filters",
            EntryField::Metadata => "metadata",
            EntryField::Macros => "macros",
            EntryField::ConcurrencyLimit => "concurrencyLimit",
            EntryField::CmdStop => "cmdStop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

/// One model's configuration record.
///
/// `None` means the field is absent from the document. A known field whose
/// value had an unexpected type lives in `extra` under its own name and
/// still counts as present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelEntry {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cmd: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub env: Option<Vec<String>>,
    pub ttl: Option<i64>,
    pub unlisted: Option<bool>,
    pub filters: Option<Mapping>,
    pub metadata: Option<Mapping>,
    pub macros: Option<Mapping>,
    pub concurrency_limit: Option<i64>,
    pub cmd_stop: Option<String>,
    /// Unrecognised fields, in document order
    pub extra: Mapping,
}

impl ModelEntry {
    /// Read an entry from a YAML mapping.
    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut entry = ModelEntry::default();
        for (key, value) in mapping {
            let field = key.as_str().and_then(EntryField::from_name);
            let stored = match field {
                Some(field) => entry.set_typed(field, &value),
                None => false,
            };
            if !stored {
                entry.extra.insert(key, value);
            }
        }
        entry
    }

    /// Whether `field` is present, typed or not.
    pub fn has(&self, field: EntryField) -> bool {
        let typed = match field {
            EntryField::Name => self.name.is_some(),
            EntryField::Description => self.description.is_some(),
            EntryField::Cmd => self.cmd.is_some(),
            EntryField::Aliases => self.aliases.is_some(),
            EntryField::Env => self.env.is_some(),
            EntryField::Ttl => self.ttl.is_some(),
            EntryField::Unlisted => self.unlisted.is_some(),
            EntryField::Filters => self.filters.is_some(),
            EntryField::Metadata => self.metadata.is_some(),
            EntryField::Macros => self.macros.is_some(),
            EntryField::ConcurrencyLimit => self.concurrency_limit.is_some(),
            EntryField::CmdStop => self.cmd_stop.is_some(),
        };
        typed || self.extra.contains_key(field.as_str())
    }

    /// Fields absent from this entry.
    pub fn missing_fields(&self) -> Vec<EntryField> {
        EntryField::ALL
            .into_iter()
            .filter(|field| !self.has(*field))
            .collect()
    }

    /// Copy `fields` from `source`, leaving everything else alone.
    ///
    /// Fields already present are never overwritten.
    pub fn fill_from(&mut self, source: &ModelEntry, fields: &[EntryField]) {
        for field in fields {
            if self.has(*field) {
                continue;
            }
            match field {
                EntryField::Name => self.name = source.name.clone(),
                EntryField::Description => self.description = source.description.clone(),
                EntryField::Cmd => self.cmd = source.cmd.clone(),
                EntryField::Aliases => self.aliases = source.aliases.clone(),
                EntryField::Env => self.env = source.env.clone(),
                EntryField::Ttl => self.ttl = source.ttl,
                EntryField::Unlisted => self.unlisted = source.unlisted,
                EntryField::Filters => self.filters = source.filters.clone(),
                EntryField::Metadata => self.metadata = source.metadata.clone(),
                EntryField::Macros => self.macros = source.macros.clone(),
                EntryField::ConcurrencyLimit => self.concurrency_limit = source.concurrency_limit,
                EntryField::CmdStop => self.cmd_stop = source.cmd_stop.clone(),
            }
        }
    }

    /// Write the entry back out: known fields in canonical order, then the rest.
    pub fn to_mapping(&self) -> Result<Mapping> {
        let mut mapping = Mapping::new();
        for field in EntryField::ALL {
            if let Some(value) = self.typed_value(field)? {
                mapping.insert(Value::String(field.as_str().to_string()), value);
            } else if let Some(value) = self.extra.get(field.as_str()) {
                mapping.insert(Value::String(field.as_str().to_string()), value.clone());
            }
        }
        for (key, value) in &self.extra {
            if !mapping.contains_key(key) {
                mapping.insert(key.clone(), value.clone());
            }
        }
        Ok(mapping)
    }

    fn set_typed(&mut self, field: EntryField, value: &Value) -> bool {
        match field {
            EntryField::Name => store(&mut self.name, value),
            EntryField::Description => store(&mut self.description, value),
            EntryField::Cmd => store(&mut self.cmd, value),
            EntryField::Aliases => store(&mut self.aliases, value),
            EntryField::Env => store(&mut self.env, value),
            EntryField::Ttl => store(&mut self.ttl, value),
            EntryField::Unlisted => store(&mut self.unlisted, value),
            EntryField::Filters => store(&mut self.filters, value),
            EntryField::Metadata => store(&mut self.metadata, value),
            EntryField::Macros => store(&mut self.macros, value),
            EntryField::ConcurrencyLimit => store(&mut self.concurrency_limit, value),
            EntryField::CmdStop => store(&mut self.cmd_stop, value),
        }
    }

    fn typed_value(&self, field: EntryField) -> Result<Option<Value>> {
        match field {
            EntryField::Name => to_value(&self.name),
            EntryField::Description => to_value(&self.description),
            EntryField::Cmd => to_value(&self.cmd),
            EntryField::Aliases => to_value(&self.aliases),
            EntryField::Env => to_value(&self.env),
            EntryField::Ttl => to_value(&self.ttl),
            EntryField::Unlisted => to_value(&self.unlisted),
            EntryField::Filters => to_value(&self.filters),
            EntryField::Metadata => to_value(&self.metadata),
            EntryField::Macros => to_value(&self.macros),
            EntryField::ConcurrencyLimit => to_value(&self.concurrency_limit),
            EntryField::CmdStop => to_value(&self.cmd_stop),
        }
    }
}

fn store<T: DeserializeOwned>(slot: &mut Option<T>, value: &Value) -> bool {
    match serde_yaml::from_value::<T>(value.clone()) {
        Ok(parsed) => {
            *slot = Some(parsed);
            true
        }
        Err(_) => false,
    }
}

fn to_value<T: Serialize>(slot: &Option<T>) -> Result<Option<Value>> {
    match slot {
        Some(inner) => Ok(Some(serde_yaml::to_value(inner)?)),
        None => Ok(None),
    }
}

/// A `models` value as found on load.
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySlot {
    /// A mapping, read into the entry schema
    Valid(ModelEntry),
    /// Anything else, kept verbatim until the audit repairs it
    Malformed(Value),
}

impl EntrySlot {
    /// Decide once, at load time, whether a value is a usable record.
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Mapping(mapping) => EntrySlot::Valid(ModelEntry::from_mapping(mapping)),
            other => EntrySlot::Malformed(other),
        }
    }

    pub fn as_entry(&self) -> Option<&ModelEntry> {
        match self {
            EntrySlot::Valid(entry) => Some(entry),
            EntrySlot::Malformed(_) => None,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        match self {
            EntrySlot::Valid(entry) => Ok(Value::Mapping(entry.to_mapping()?)),
            EntrySlot::Malformed(raw) => Ok(raw.clone()),
        }
    }
}

/// Short description of a YAML value's shape, for log lines.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_from_mapping_reads_known_fields() {
        let entry = ModelEntry::from_mapping(mapping(
            "name: My Model\nttl: 120\naliases: [a, b]\nconcurrencyLimit: 2\nunlisted: true\n",
        ));
        assert_eq!(entry.name.as_deref(), Some("My Model"));
        assert_eq!(entry.ttl, Some(120));
        assert_eq!(entry.aliases, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(entry.concurrency_limit, Some(2));
        assert_eq!(entry.unlisted, Some(true));
        assert!(entry.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let entry = ModelEntry::from_mapping(mapping("name: x\nproxy: http://127.0.0.1:9000\n"));
        assert_eq!(
            entry.extra.get("proxy"),
            Some(&Value::String("http://127.0.0.1:9000".into()))
        );
        let out = entry.to_mapping().unwrap();
        assert!(out.contains_key("proxy"));
    }

    #[test]
    fn test_mistyped_field_counts_as_present() {
        let entry = ModelEntry::from_mapping(mapping("ttl: forever\n"));
        assert_eq!(entry.ttl, None);
        assert!(entry.has(EntryField::Ttl));
        assert!(!entry.missing_fields().contains(&EntryField::Ttl));

        let out = entry.to_mapping().unwrap();
        assert_eq!(out.get("ttl"), Some(&Value::String("forever".into())));
    }

    #[test]
    fn test_fill_from_only_touches_absent_fields() {
        let mut entry = ModelEntry::from_mapping(mapping("description: mine\n"));
        let source = ModelEntry {
            description: Some("template".into()),
            ttl: Some(0),
            ..ModelEntry::default()
        };
        let missing = entry.missing_fields();
        entry.fill_from(&source, &missing);
        assert_eq!(entry.description.as_deref(), Some("mine"));
        assert_eq!(entry.ttl, Some(0));
    }

    #[test]
    fn test_to_mapping_uses_canonical_order() {
        let entry = ModelEntry::from_mapping(mapping("extra: 1\ncmd: run\nname: n\n"));
        let mapping = entry.to_mapping().unwrap();
        let keys: Vec<&str> = mapping
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["name", "cmd", "extra"]);
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            EntrySlot::classify(Value::String("oops".into())),
            EntrySlot::Malformed(_)
        ));
        assert!(matches!(EntrySlot::classify(Value::Null), EntrySlot::Malformed(_)));
        assert!(matches!(
            EntrySlot::classify(Value::Mapping(Mapping::new())),
            EntrySlot::Valid(_)
        ));
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in EntryField::ALL {
            assert_eq!(EntryField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(EntryField::from_name("cmd_stop"), None);
    }
}
