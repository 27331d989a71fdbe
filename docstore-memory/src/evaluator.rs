//! Query evaluation and ordering for in-memory record filtering.
//!
//! Records are matched against a [`Query`] clause by clause. Field paths are resolved
//! segment by segment through nested objects (and arrays, for numeric segments). Values are
//! compared through [`Comparable`], which normalizes all numbers to `f64` so `1` and `1.0`
//! are equal.

use serde_json::Value;
use std::{cmp::Ordering, collections::BTreeMap};

use docstore_core::{
    query::{Clause, Condition, PATH_SEPARATOR, Query, SortDirection, SortSpec},
    record::Record,
};

/// Type-erased, comparable representation of JSON values.
///
/// # Note
///
/// This is a private implementation detail used for query evaluation.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// All integers and floats normalized to f64
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(BTreeMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Value::String(value) => Comparable::String(value),
            Value::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(map) => Comparable::Map(
                map
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<BTreeMap<_, _>>()
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> Comparable<'a> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Map(_) => 5,
        }
    }

    /// A total order over all values: first by kind
    /// (null < bool < number < string < array < object), then by value.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.total_cmp(y))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.total_cmp(vb)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Resolves the segments of a field path against a record. Numeric segments index
/// into arrays.
///
/// Returns `None` as soon as a segment is absent.
pub(crate) fn resolve<'a, 'p>(
    record: &'a Record,
    path: impl IntoIterator<Item = &'p str>,
) -> Option<&'a Value> {
    let mut segments = path.into_iter();
    let mut current = record.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

pub(crate) struct RecordEvaluator<'a> {
    record: &'a Record,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// Returns true if every clause of the query holds. An empty query matches.
    pub fn evaluate(&self, query: &Query) -> bool {
        query
            .clauses()
            .iter()
            .all(|clause| self.evaluate_clause(clause))
    }

    fn evaluate_clause(&self, clause: &Clause) -> bool {
        let Some(value) = resolve(self.record, clause.path()) else {
            return false;
        };
        let value = Comparable::from(value);

        match &clause.condition {
            Condition::Eq(expected) => value == Comparable::from(expected),
            Condition::In(candidates) => candidates
                .iter()
                .any(|candidate| value == Comparable::from(candidate)),
        }
    }

    /// Returns copies of the records matching the query, in input order.
    pub fn filter_records(
        records: impl IntoIterator<Item = &'a Record>,
        query: &Query,
    ) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| RecordEvaluator::new(record).evaluate(query))
            .cloned()
            .collect::<Vec<_>>()
    }
}

/// Sorts records in place by the primary key of the sort specification.
///
/// A missing field sorts as null. The sort is stable, so records with equal keys keep
/// their relative order.
pub(crate) fn sort_records(records: &mut [Record], sort: Option<&SortSpec>) {
    let Some((field, direction)) = sort.and_then(SortSpec::primary) else {
        return;
    };

    records.sort_by(|a, b| {
        let left = resolve(a, field.split(PATH_SEPARATOR))
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = resolve(b, field.split(PATH_SEPARATOR))
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        match direction {
            SortDirection::Asc => left.total_cmp(&right),
            SortDirection::Desc => right.total_cmp(&left),
        }
    });
}
