// Record trait for anything the query layer can filter

use crate::models::{Task, TaskId};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Core trait for records held by the store
pub trait Record {
    /// Unique identifier for this record
    fn id(&self) -> TaskId;

    /// Creation instant, never changes after the record exists
    fn created_at(&self) -> DateTime<Utc>;

    /// Fields exposed to field filters
    /// Absent optional fields are left out of the map
    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        HashMap::new()
    }
}

/// Value types that can be indexed for filtering
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Bool(bool),
    Date(NaiveDate),
}

impl IndexValue {
    /// Order two values of the same kind; mixed kinds are incomparable
    pub fn compare(&self, other: &IndexValue) -> Option<Ordering> {
        match (self, other) {
            (IndexValue::String(a), IndexValue::String(b)) => Some(a.cmp(b)),
            (IndexValue::Bool(a), IndexValue::Bool(b)) => Some(a.cmp(b)),
            (IndexValue::Date(a), IndexValue::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::Bool(b) => write!(f, "{}", b),
            IndexValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Record for Task {
    fn id(&self) -> TaskId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("completed".to_string(), IndexValue::Bool(self.completed));
        fields.insert(
            "priority".to_string(),
            IndexValue::String(self.priority.as_str().to_string()),
        );
        if let Some(category) = &self.category {
            fields.insert("category".to_string(), IndexValue::String(category.clone()));
        }
        if let Some(due) = self.due_date {
            fields.insert("due_date".to_string(), IndexValue::Date(due));
        }
        fields
    }
}
