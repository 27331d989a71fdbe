//! Schema capability used by entity stores.
//!
//! An entity store never interprets validation rules itself. It asks a [`Schema`] to strip
//! undeclared properties, cast declared ones to their types, and validate the result.
//! [`SimpleSchema`] is a small declarative implementation covering the common cases.
//!
//! # Example
//!
//! ```ignore
//! use docstore::schema::{SimpleSchema, Field, FieldKind};
//!
//! let schema = SimpleSchema::builder()
//!     .field("name", Field::new(FieldKind::String).required())
//!     .field("age", Field::new(FieldKind::Integer))
//!     .field("email", Field::new(FieldKind::String).tag("public"))
//!     .build();
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::record::Record;

/// Name of the validation set whose rules always apply.
pub const DEFAULT_VALIDATION_SET: &str = "all";

/// Field name to human-readable violation message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation. The first message per field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, message) in iter {
            errors.add(field, message);
        }
        errors
    }
}

/// Casting, stripping and validation of records.
#[async_trait]
pub trait Schema: Send + Sync {
    /// Converts declared properties to their declared types where possible.
    fn cast(&self, record: Record) -> Record;

    /// Removes properties the schema does not declare. When a tag is given, only
    /// properties carrying that tag are kept.
    fn strip_unknown_properties(&self, record: Record, tag: Option<&str>) -> Record;

    /// Validates a record, returning an empty map when it is valid.
    ///
    /// `validation_set` selects additional named rule sets on top of the always-on
    /// [`DEFAULT_VALIDATION_SET`]. `tag` restricts validation to tagged properties.
    async fn validate(
        &self,
        record: &Record,
        validation_set: Option<&str>,
        tag: Option<&str>,
    ) -> ValidationErrors;
}

#[async_trait]
impl<S: Schema + ?Sized> Schema for Arc<S> {
    fn cast(&self, record: Record) -> Record {
        (**self).cast(record)
    }

    fn strip_unknown_properties(&self, record: Record, tag: Option<&str>) -> Record {
        (**self).strip_unknown_properties(record, tag)
    }

    async fn validate(
        &self,
        record: &Record,
        validation_set: Option<&str>,
        tag: Option<&str>,
    ) -> ValidationErrors {
        (**self).validate(record, validation_set, tag).await
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldKind {
    /// Any JSON value; never cast.
    #[default]
    Any,
    /// A string. Numbers and booleans are cast to their text.
    String,
    /// A number. Numeric strings are parsed.
    Number,
    /// A whole number. Numeric strings and integral floats are cast.
    Integer,
    /// A boolean. Boolean strings and numbers are cast.
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Any => "a value",
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::Object => "an object",
            FieldKind::Array => "an array",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (FieldKind::Any, _) => true,
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldKind::Boolean, Value::Bool(_)) => true,
            (FieldKind::Object, Value::Object(_)) => true,
            (FieldKind::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    fn cast(&self, value: Value) -> Value {
        match (self, value) {
            (FieldKind::String, Value::Number(n)) => Value::String(n.to_string()),
            (FieldKind::String, Value::Bool(b)) => Value::String(b.to_string()),
            (FieldKind::Number | FieldKind::Integer | FieldKind::Boolean, Value::String(s))
                if s.trim().is_empty() =>
            {
                Value::Null
            }
            (FieldKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(number_from_f64)
                .unwrap_or(Value::String(s)),
            (FieldKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::String(s)),
            (FieldKind::Integer, Value::Number(n)) if !(n.is_i64() || n.is_u64()) => n
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| Value::from(f as i64))
                .unwrap_or(Value::Number(n)),
            (FieldKind::Boolean, Value::String(s)) => match s.trim() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::String(s),
            },
            (FieldKind::Boolean, Value::Number(n)) => Value::Bool(n.as_f64() != Some(0.0)),
            (_, value) => value,
        }
    }
}

fn number_from_f64(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

/// A validation rule: receives the field label and value, returns a message on failure.
pub type Validator = Arc<dyn Fn(&str, Option<&Value>) -> Option<String> + Send + Sync>;

/// Declaration of a single schema field.
#[derive(Clone, Default)]
pub struct Field {
    kind: FieldKind,
    tags: Vec<String>,
    validators: Vec<(String, Validator)>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self { kind, ..Default::default() }
    }

    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    /// Tags the field, so it survives tag-restricted stripping and validation.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Requires a non-null, non-empty value.
    pub fn required(self) -> Self {
        self.validator(|label, value| match value {
            None | Some(Value::Null) => Some(format!("{label} is required")),
            Some(Value::String(s)) if s.is_empty() => Some(format!("{label} is required")),
            _ => None,
        })
    }

    /// Adds a rule to the always-on validation set.
    pub fn validator<F>(self, rule: F) -> Self
    where
        F: Fn(&str, Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        self.validator_in(DEFAULT_VALIDATION_SET, rule)
    }

    /// Adds a rule that only applies when the named validation set is requested.
    pub fn validator_in<F>(mut self, set: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&str, Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        self.validators.push((set.into(), Arc::new(rule)));
        self
    }

    fn has_tag(&self, tag: Option<&str>) -> bool {
        tag.is_none_or(|tag| self.tags.iter().any(|t| t == tag))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// A declarative [`Schema`] built from [`Field`] declarations.
#[derive(Debug, Clone, Default)]
pub struct SimpleSchema {
    fields: BTreeMap<String, Field>,
}

impl SimpleSchema {
    pub fn builder() -> SimpleSchemaBuilder {
        SimpleSchemaBuilder::default()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

#[async_trait]
impl Schema for SimpleSchema {
    fn cast(&self, mut record: Record) -> Record {
        for (name, field) in &self.fields {
            if let Some(value) = record.remove(name) {
                record.insert(name.clone(), field.kind.cast(value));
            }
        }
        record
    }

    fn strip_unknown_properties(&self, mut record: Record, tag: Option<&str>) -> Record {
        record.retain(|name, _| {
            self.fields
                .get(name)
                .is_some_and(|field| field.has_tag(tag))
        });
        record
    }

    async fn validate(
        &self,
        record: &Record,
        validation_set: Option<&str>,
        tag: Option<&str>,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        for (name, field) in self.fields.iter().filter(|(_, f)| f.has_tag(tag)) {
            let label = humanize(name);
            let value = record.get(name);

            if let Some(value) = value {
                if !field.kind.accepts(value) {
                    errors.add(name, format!("{label} must be {}", field.kind.describe()));
                    continue;
                }
            }

            let active = field
                .validators
                .iter()
                .filter(|(set, _)| set == DEFAULT_VALIDATION_SET || Some(set.as_str()) == validation_set);

            for (_, rule) in active {
                if let Some(message) = rule(&label, value) {
                    errors.add(name, message);
                    break;
                }
            }
        }

        errors
    }
}

#[derive(Debug, Default)]
pub struct SimpleSchemaBuilder {
    fields: BTreeMap<String, Field>,
}

impl SimpleSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn build(self) -> SimpleSchema {
        SimpleSchema { fields: self.fields }
    }
}

/// Turns `firstName` or `first_name` into `First name`.
fn humanize(name: &str) -> String {
    let mut label = String::with_capacity(name.len() + 4);

    for (i, c) in name.chars().enumerate() {
        if c == '_' || c == '-' {
            label.push(' ');
        } else if c.is_uppercase() && i > 0 {
            label.push(' ');
            label.extend(c.to_lowercase());
        } else if i == 0 {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
    }

    label
}
