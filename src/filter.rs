// Field filtering for records

use crate::record::{IndexValue, Record};
use std::cmp::Ordering;

/// Filter for querying records
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: IndexValue,
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // ==
    Ne,       // !=
    Gt,       // >
    Lt,       // <
    Gte,      // >=
    Lte,      // <=
    Contains, // case-insensitive substring
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: IndexValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for an equality filter
    pub fn eq(field: impl Into<String>, value: IndexValue) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Check a record against this filter
    ///
    /// A record that does not index the field never matches, whatever the
    /// operator. Values of different kinds never match either.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let fields = record.indexed_fields();
        match fields.get(&self.field) {
            Some(actual) => self.op.apply(actual, &self.value),
            None => false,
        }
    }
}

impl FilterOp {
    pub(crate) fn apply(self, actual: &IndexValue, expected: &IndexValue) -> bool {
        let ordering = actual.compare(expected);
        match self {
            FilterOp::Eq => ordering == Some(Ordering::Equal),
            FilterOp::Ne => matches!(ordering, Some(Ordering::Less | Ordering::Greater)),
            FilterOp::Gt => ordering == Some(Ordering::Greater),
            FilterOp::Lt => ordering == Some(Ordering::Less),
            FilterOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Contains => match (actual, expected) {
                (IndexValue::String(a), IndexValue::String(e)) => a.to_lowercase().contains(&e.to_lowercase()),
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "="),
            FilterOp::Ne => write!(f, "!="),
            FilterOp::Gt => write!(f, ">"),
            FilterOp::Lt => write!(f, "<"),
            FilterOp::Gte => write!(f, ">="),
            FilterOp::Lte => write!(f, "<="),
            FilterOp::Contains => write!(f, "contains"),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// True when every filter matches the record
pub fn matches_all<R: Record>(record: &R, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}
