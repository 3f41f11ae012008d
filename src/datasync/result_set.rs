//! Subscription Result Sets
//!
//! The client's copy of a realtime query result, kept current by applying
//! the insert/update/delete deltas the platform pushes.

use uuid::Uuid;

use crate::models::{record_id, Record};
use crate::query::Query;

/// Ordered records of one subscription
#[derive(Debug, Clone)]
pub struct ResultSet {
    query: Query,
    records: Vec<Record>,
}

impl ResultSet {
    /// Create from the initial result the platform delivered
    ///
    /// The platform already sorted it; sorting again is stable and keeps
    /// later inserts consistent with the same comparator.
    pub fn new(query: Query, initial: Vec<Record>) -> Self {
        let mut set = Self {
            query,
            records: initial,
        };
        set.sort();
        set
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record after any records that sort equal to it
    ///
    /// Returns false if the query does not match the record.
    pub fn insert(&mut self, record: Record) -> bool {
        if !self.query.matches(&record) {
            return false;
        }
        if let Some(id) = record_id(&record) {
            let id = id.to_string();
            self.remove(&id);
        }
        let position = self
            .records
            .partition_point(|existing| self.query.compare(existing, &record).is_le());
        self.records.insert(position, record);
        self.truncate_to_limit();
        true
    }

    /// Merge a change set into the record with `id`
    ///
    /// Returns true if the result set changed.
    pub fn update(&mut self, id: &Uuid, change_set: &Record) -> bool {
        let Some(index) = self.position(&id.to_string()) else {
            return false;
        };
        let mut record = self.records.remove(index);
        for (key, value) in change_set {
            record.insert(key.clone(), value.clone());
        }
        if self.query.matches(&record) {
            let position = self
                .records
                .partition_point(|existing| self.query.compare(existing, &record).is_le());
            self.records.insert(position, record);
        }
        true
    }

    /// Remove the record with `id`
    pub fn delete(&mut self, id: &Uuid) -> bool {
        self.remove(&id.to_string())
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| record_id(r).is_some_and(|rid| rid.eq_ignore_ascii_case(id)))
    }

    fn sort(&mut self) {
        let query = &self.query;
        self.records.sort_by(|a, b| query.compare(a, b));
        self.truncate_to_limit();
    }

    fn truncate_to_limit(&mut self) {
        if let Some(limit) = self.query.limit {
            self.records.truncate(limit as usize);
        }
    }
}
