//! Ordered record snapshots.
//!
//! A [`SnapshotData`] is the complete record set of an engine, keyed by identity value and
//! kept in insertion order. It serializes as a single JSON object whose entries appear in
//! that order, and deserializing reads the entries back in file order.

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use std::fmt;

use crate::record::Record;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotData {
    entries: Vec<(String, Record)>,
}

impl SnapshotData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Ordering is the caller's responsibility.
    pub fn push(&mut self, id: impl Into<String>, record: Record) {
        self.entries.push((id.into(), record));
    }

    /// Returns the record stored under `id`.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, record)| record)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Record)> for SnapshotData {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl IntoIterator for SnapshotData {
    type Item = (String, Record);
    type IntoIter = std::vec::IntoIter<(String, Record)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for SnapshotData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, record) in &self.entries {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SnapshotData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = SnapshotData;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object mapping identity values to records")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries: Vec<(String, Record)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, record)) = access.next_entry::<String, Record>()? {
                    // A repeated key keeps its first position and its last value.
                    match entries.iter_mut().find(|(key, _)| *key == id) {
                        Some((_, existing)) => *existing = record,
                        None => entries.push((id, record)),
                    }
                }
                Ok(SnapshotData { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let data = ["2", "10", "1"]
            .into_iter()
            .map(|id| (id.to_string(), record(json!({ "_id": id }))))
            .collect::<SnapshotData>();

        let text = serde_json::to_string(&data).unwrap();

        assert_eq!(text, r#"{"2":{"_id":"2"},"10":{"_id":"10"},"1":{"_id":"1"}}"#);
    }

    #[test]
    fn test_deserializes_in_file_order() {
        let data: SnapshotData =
            serde_json::from_str(r#"{ "b": {}, "a": { "v": 1 }, "c": {} }"#).unwrap();

        assert_eq!(data.ids().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(data.get("a"), Some(&record(json!({ "v": 1 }))));
    }

    #[test]
    fn test_repeated_key_keeps_last_value() {
        let data: SnapshotData =
            serde_json::from_str(r#"{ "a": { "v": 1 }, "b": {}, "a": { "v": 2 } }"#).unwrap();

        assert_eq!(data.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(data.get("a"), Some(&record(json!({ "v": 2 }))));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(serde_json::from_str::<SnapshotData>("[1, 2]").is_err());
    }
}
