//! Records, identity values and typed document conversion.
//!
//! A [`Record`] is a JSON object. One of its properties (by default `_id`) is the identity
//! property; engines always store and return its value as a string, no matter what type
//! the caller supplied.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, from_value, to_value};
use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A single stored document: a mapping of field name to JSON value.
pub type Record = Map<String, Value>;

/// Default name of the identity property.
pub const DEFAULT_ID_PROPERTY: &str = "_id";

/// A normalized identity value.
///
/// Identity values are always strings. Numbers, booleans and other JSON values supplied by
/// callers are coerced with [`RecordId::from_value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Coerces any non-null JSON value into an identity value.
    ///
    /// Returns `None` for `null`. Strings are used as-is, numbers and booleans use their
    /// textual form and composite values use their compact JSON encoding.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Bool(b) => Some(Self(b.to_string())),
            other => Some(Self(other.to_string())),
        }
    }

    /// Like [`RecordId::from_value`], but treats falsy values as absent.
    ///
    /// `null`, `false`, `0`, `NaN` and the empty string all count as "no id", so a caller
    /// can never end up with one of them as an identity value.
    pub fn from_truthy(value: &Value) -> Option<Self> {
        if is_falsy(value) {
            None
        } else {
            Self::from_value(value)
        }
    }

    /// Reads the identity property of a record, treating `null` as absent.
    pub fn of(record: &Record, id_property: &str) -> Option<Self> {
        record
            .get(id_property)
            .and_then(Self::from_value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the identity as the JSON value stored in records.
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for RecordId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

impl From<&RecordId> for RecordId {
    fn from(id: &RecordId) -> Self {
        id.clone()
    }
}

macro_rules! record_id_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RecordId {
                fn from(id: $ty) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

record_id_from_integer!(u32, u64, usize, i32, i64);

/// JavaScript-style falsiness for JSON values.
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| f == 0.0 || f.is_nan())
            .unwrap_or(false),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Converts a JSON value into a record.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if the value is not an object.
pub fn into_record(value: Value) -> DocumentStoreResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected an object, found {other}"
        ))),
    }
}

/// A strongly-typed entity that can be stored as a record.
///
/// # Example
///
/// ```ignore
/// use docstore::record::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Contact {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     pub id: Option<String>,
///     pub name: String,
/// }
///
/// impl Document for Contact {
///     fn collection_name() -> &'static str {
///         "contact"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the name of the entity store this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait converting documents to and from records.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Serializes this document into a record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or does not produce an object.
    fn to_record(&self) -> DocumentStoreResult<Record>;

    /// Deserializes a document from a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not match the document's structure.
    fn from_record(record: Record) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_record(&self) -> DocumentStoreResult<Record> {
        into_record(to_value(self)?)
    }

    fn from_record(record: Record) -> DocumentStoreResult<Self> {
        Ok(from_value(Value::Object(record))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerces_ids_to_strings() {
        assert_eq!(RecordId::from_value(&json!(6)).unwrap().as_str(), "6");
        assert_eq!(RecordId::from_value(&json!("7")).unwrap().as_str(), "7");
        assert_eq!(RecordId::from_value(&json!(true)).unwrap().as_str(), "true");
        assert_eq!(RecordId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_falsy_values_are_not_ids() {
        for falsy in [json!(null), json!(""), json!(false), json!(0), json!(0.0)] {
            assert_eq!(RecordId::from_truthy(&falsy), None, "{falsy} should be absent");
        }

        assert_eq!(RecordId::from_truthy(&json!("0")).unwrap().as_str(), "0");
        assert_eq!(RecordId::from_truthy(&json!(12)).unwrap().as_str(), "12");
    }

    #[test]
    fn test_into_record_rejects_non_objects() {
        assert!(into_record(json!({ "a": 1 })).is_ok());
        assert!(matches!(
            into_record(json!([1, 2])),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Contact {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
    }

    impl Document for Contact {
        fn collection_name() -> &'static str {
            "contact"
        }
    }

    #[test]
    fn test_document_record_conversion() {
        let contact = Contact { id: None, name: "Alice".into() };
        let record = contact.to_record().unwrap();
        assert_eq!(Value::Object(record.clone()), json!({ "name": "Alice" }));

        let mut stored = record;
        stored.insert("_id".into(), json!("1"));
        let restored = Contact::from_record(stored).unwrap();
        assert_eq!(restored.id.as_deref(), Some("1"));
    }
}
