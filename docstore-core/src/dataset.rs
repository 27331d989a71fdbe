//! Result sets returned by entity-store queries.
//!
//! Multi-record results are wrapped in a [`DataSet`] instead of being exposed as raw
//! collections. A data set supports sequential consumption through
//! [`get_next`](DataSet::get_next) alongside the usual iteration helpers.

use serde::{Deserialize, Serialize};

use crate::{
    error::DocumentStoreResult,
    record::{Document, DocumentExt, Record},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataSet<T = Record> {
    items: Vec<T>,
    #[serde(skip)]
    cursor: usize,
}

impl<T> DataSet<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, cursor: 0 }
    }

    /// Returns the next item in sequence, or `None` once the set is exhausted.
    pub fn get_next(&mut self) -> Option<&T> {
        let item = self.items.get(self.cursor)?;
        self.cursor += 1;
        Some(item)
    }

    /// Restarts sequential consumption from the first item.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn for_each(&self, f: impl FnMut(&T)) {
        self.items.iter().for_each(f);
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Vec<U> {
        self.items.iter().map(f).collect()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns the items as a vector, leaving the set untouched.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.clone()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl DataSet<Record> {
    /// Deserializes every record into a typed document.
    ///
    /// # Errors
    ///
    /// Returns an error if any record does not match the document's structure.
    pub fn into_typed<D: Document>(self) -> DocumentStoreResult<DataSet<D>> {
        Ok(DataSet::new(
            self.items
                .into_iter()
                .map(D::from_record)
                .collect::<DocumentStoreResult<Vec<D>>>()?,
        ))
    }
}

impl<T> Default for DataSet<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> From<Vec<T>> for DataSet<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> IntoIterator for DataSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a DataSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
