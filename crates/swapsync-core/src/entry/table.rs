//! The `models` section: an ordered map from key to entry.

use crate::discovery::ModelKey;
use crate::entry::model::EntrySlot;
use crate::error::Result;
use serde_yaml::{Mapping, Value};
use tracing::warn;

/// Ordered model table. Keeps the document's order; new keys are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTable {
    entries: Vec<(ModelKey, EntrySlot)>,
}

impl ModelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `models` mapping, classifying every value once.
    ///
    /// Scalar keys are stringified; other keys cannot name a model and are
    /// dropped with a warning.
    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut table = ModelTable::new();
        for (key, value) in mapping {
            let key = match key {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    warn!("Dropping model entry with a non-scalar key: {:?}", other);
                    continue;
                }
            };
            table.insert(ModelKey::new(key), EntrySlot::classify(value));
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&EntrySlot> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut EntrySlot> {
        self.position(key).map(move |idx| &mut self.entries[idx].1)
    }

    /// Insert or replace in place.
    pub fn insert(&mut self, key: ModelKey, slot: EntrySlot) {
        match self.position(key.as_str()) {
            Some(idx) => self.entries[idx].1 = slot,
            None => self.entries.push((key, slot)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<EntrySlot> {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModelKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelKey, &EntrySlot)> {
        self.entries.iter().map(|(key, slot)| (key, slot))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ModelKey, &mut EntrySlot)> {
        self.entries.iter_mut().map(|(key, slot)| (&*key, slot))
    }

    /// Serialize back to a YAML mapping.
    pub fn to_mapping(&self) -> Result<Mapping> {
        let mut mapping = Mapping::new();
        for (key, slot) in &self.entries {
            mapping.insert(Value::String(key.to_string()), slot.to_value()?);
        }
        Ok(mapping)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.as_str() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::model::ModelEntry;

    #[test]
    fn test_preserves_document_order() {
        let mapping: Mapping = serde_yaml::from_str("zeta: {}\nalpha: {}\nmid: {}\n").unwrap();
        let table = ModelTable::from_mapping(mapping);
        let keys: Vec<&str> = table.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut table = ModelTable::new();
        table.insert(ModelKey::new("a"), EntrySlot::Malformed(Value::Null));
        table.insert(ModelKey::new("b"), EntrySlot::Valid(ModelEntry::default()));
        table.insert(ModelKey::new("a"), EntrySlot::Valid(ModelEntry::default()));

        assert_eq!(table.len(), 2);
        assert!(matches!(table.get("a"), Some(EntrySlot::Valid(_))));
        assert_eq!(table.keys().next().map(|k| k.as_str()), Some("a"));

        assert!(table.remove("a").is_some());
        assert!(!table.contains("a"));
        assert!(table.remove("a").is_none());
    }

    #[test]
    fn test_scalar_keys_are_stringified() {
        let mapping: Mapping = serde_yaml::from_str("42: {}\ntrue: {}\n").unwrap();
        let table = ModelTable::from_mapping(mapping);
        assert!(table.contains("42"));
        assert!(table.contains("true"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_malformed_values_round_trip_verbatim() {
        let mapping: Mapping = serde_yaml::from_str("broken: just a string\n").unwrap();
        let table = ModelTable::from_mapping(mapping);
        let out = table.to_mapping().unwrap();
        assert_eq!(out.get("broken"), Some(&Value::String("just a string".into())));
    }
}
