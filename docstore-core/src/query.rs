//! Query construction and result shaping for document stores.
//!
//! A [`Query`] is a conjunction of clauses, each addressing a field path (possibly
//! dot-separated for nested access) with either an equality value or a `$in` candidate
//! list. An empty query matches every record.
//!
//! # Query Building
//!
//! ```ignore
//! use docstore::query::{Query, FindOptions, SortDirection};
//!
//! let query = Query::builder()
//!     .eq("status", "active")
//!     .eq("address.city", "Leeds")
//!     .is_in("rank", [1, 3])
//!     .build();
//!
//! let options = FindOptions::new().sort("created", SortDirection::Desc);
//! ```
//!
//! Queries can also be read from their JSON form:
//!
//! ```ignore
//! let query = Query::try_from(json!({ "findTest": { "$in": [1, 3] } }))?;
//! ```

use serde_json::Value;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

/// The operator key for membership clauses.
pub const IN_OPERATOR: &str = "$in";

/// Separator between segments of a nested field path.
pub const PATH_SEPARATOR: char = '.';

/// What a single query clause requires of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value.
    Eq(Value),
    /// The field equals one of the candidates.
    In(Vec<Value>),
}

/// A single clause: a field path and the condition its value must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// The field path. Dot-separated paths address nested objects.
    pub field: String,
    /// The condition the resolved value must satisfy.
    pub condition: Condition,
}

impl Clause {
    /// Returns the path segments of this clause's field.
    pub fn path(&self) -> impl Iterator<Item = &str> {
        self.field.split(PATH_SEPARATOR)
    }
}

/// A conjunction of clauses. Every clause must hold for a record to match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    /// Creates an empty query, which matches every record.
    pub fn new() -> Self {
        Self { clauses: Vec::new() }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Builds a query from a record-shaped object.
    ///
    /// Each property becomes a clause. An object value containing `$in` becomes a
    /// membership clause, anything else is an equality clause.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] if a `$in` operand is not an array.
    pub fn from_record(record: &Record) -> DocumentStoreResult<Self> {
        let mut clauses = Vec::with_capacity(record.len());

        for (field, value) in record {
            let condition = match value.as_object().and_then(|op| op.get(IN_OPERATOR)) {
                Some(Value::Array(candidates)) => Condition::In(candidates.clone()),
                Some(other) => {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "'{IN_OPERATOR}' on '{field}' expects an array, found {other}"
                    )));
                }
                None => Condition::Eq(value.clone()),
            };

            clauses.push(Clause { field: field.clone(), condition });
        }

        Ok(Self { clauses })
    }

    /// Returns the clauses of this query in insertion order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns true if the query has no clauses and therefore matches everything.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl TryFrom<Value> for Query {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(record) => Query::from_record(&record),
            Value::Null => Ok(Query::new()),
            other => Err(DocumentStoreError::InvalidQuery(format!(
                "expected an object, found {other}"
            ))),
        }
    }
}

impl TryFrom<&Record> for Query {
    type Error = DocumentStoreError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Query::from_record(record)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Adds an equality clause.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.clauses.push(Clause {
            field: field.into(),
            condition: Condition::Eq(value.into()),
        });
        self
    }

    /// Adds a membership (`$in`) clause.
    pub fn is_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        candidates: impl IntoIterator<Item = V>,
    ) -> Self {
        self.query.clauses.push(Clause {
            field: field.into(),
            condition: Condition::In(candidates.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0).
    Desc,
}

impl SortDirection {
    fn parse(direction: &str) -> DocumentStoreResult<Self> {
        match direction.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(SortDirection::Asc),
            "desc" | "descending" | "-1" => Ok(SortDirection::Desc),
            other => Err(DocumentStoreError::InvalidQuery(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// Sort specification for query results.
///
/// Either a single field sorted ascending, or an ordered list of `(field, direction)`
/// pairs. Only the first pair is honored; multi-key sorting is not implemented.
#[derive(Debug, Clone, PartialEq)]
pub enum SortSpec {
    /// A single field, ascending.
    Field(String),
    /// Ordered `(field, direction)` pairs.
    Keys(Vec<(String, SortDirection)>),
}

impl SortSpec {
    /// Returns the key and direction that actually drive the ordering.
    pub fn primary(&self) -> Option<(&str, SortDirection)> {
        match self {
            SortSpec::Field(field) => Some((field.as_str(), SortDirection::Asc)),
            SortSpec::Keys(keys) => keys
                .first()
                .map(|(field, direction)| (field.as_str(), *direction)),
        }
    }
}

/// Options shaping the result set of a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Optional sort order. Results keep insertion order when absent.
    pub sort: Option<SortSpec>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts by a field in the given direction.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec::Keys(vec![(field.into(), direction)]));
        self
    }

}

impl TryFrom<Value> for FindOptions {
    type Error = DocumentStoreError;

    /// Reads `{ "sort": "field" }` or `{ "sort": [["field", "asc" | "desc"], ...] }`.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let sort = match value.get("sort") {
            None | Some(Value::Null) => None,
            Some(Value::String(field)) => Some(SortSpec::Field(field.clone())),
            Some(Value::Array(pairs)) => Some(SortSpec::Keys(
                pairs
                    .iter()
                    .map(parse_sort_pair)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )),
            Some(other) => {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "unsupported sort specification {other}"
                )));
            }
        };

        Ok(FindOptions { sort })
    }
}

fn parse_sort_pair(pair: &Value) -> DocumentStoreResult<(String, SortDirection)> {
    match pair.as_array().map(Vec::as_slice) {
        Some([Value::String(field)]) => Ok((field.clone(), SortDirection::Asc)),
        Some([Value::String(field), Value::String(direction)]) => {
            Ok((field.clone(), SortDirection::parse(direction)?))
        }
        Some([Value::String(field), Value::Number(direction)]) => {
            Ok((field.clone(), SortDirection::parse(&direction.to_string())?))
        }
        _ => Err(DocumentStoreError::InvalidQuery(format!(
            "expected a [field, direction] pair, found {pair}"
        ))),
    }
}
