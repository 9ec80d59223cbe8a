// Derived views over the task list: status filter, search, field filters, sort

use crate::filter::{Filter, matches_all};
use crate::models::{Priority, Task};
use crate::record::{IndexValue, Record};
use chrono::NaiveDate;
use eyre::{Result, eyre};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Partition of tasks by completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(eyre!("Invalid status filter: {:?} (expected all, active or completed)", other)),
        }
    }
}

/// Parameters of one view computation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    pub status: StatusFilter,
    pub search: String,
    pub filters: Vec<Filter>,
}

impl ViewQuery {
    pub fn new(status: StatusFilter) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Case-insensitive substring match on text or category
///
/// A blank query matches every task.
pub fn matches_search(task: &Task, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }

    // Surrounding spaces are part of the needle
    let needle = query.to_lowercase();
    task.text.to_lowercase().contains(&needle)
        || task
            .category
            .as_ref()
            .is_some_and(|c| c.to_lowercase().contains(&needle))
}

fn compare_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Display order of two tasks
///
/// Open before completed, then high > medium > low, then earlier due date
/// (dated before undated), then newest created, then highest id.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| compare_due(a.due_date, b.due_date))
        .then_with(|| b.created_at().cmp(&a.created_at()))
        .then_with(|| b.id().cmp(&a.id()))
}

/// Compute a filtered, searched and sorted view
///
/// Input order does not matter for the result beyond exact ties, which
/// `compare_tasks` rules out for tasks with distinct ids.
pub fn view<'a, I>(tasks: I, query: &ViewQuery) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut result: Vec<&Task> = tasks
        .into_iter()
        .filter(|task| query.status.matches(task))
        .filter(|task| matches_search(task, &query.search))
        .filter(|task| matches_all(*task, &query.filters))
        .collect();

    result.sort_by(|a, b| compare_tasks(a, b));
    result
}

/// Tasks with the given priority, in input order
pub fn by_priority<'a, I>(tasks: I, priority: Priority) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let filter = Filter::eq("priority", IndexValue::String(priority.as_str().to_string()));
    tasks.into_iter().filter(|task| filter.matches(*task)).collect()
}

/// Tasks whose category equals `category` exactly, in input order
pub fn by_category<'a, I>(tasks: I, category: &str) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let filter = Filter::eq("category", IndexValue::String(category.to_string()));
    tasks.into_iter().filter(|task| filter.matches(*task)).collect()
}
