//! Filtering and sorting of task listings.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Task, TaskStatus};
use crate::ordering;

/// AND-combined listing filters. `None` means "don't filter on this".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub urgent: Option<bool>,
    pub important: Option<bool>,
    /// Case-insensitive substring of title or description.
    pub text: Option<String>,
    /// Case-insensitive exact tag.
    pub tag: Option<String>,
}

impl TaskFilter {
    pub fn status(status: TaskStatus) -> Self {
        TaskFilter {
            status: Some(status),
            ..TaskFilter::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.urgent.is_some_and(|u| u != task.urgent) {
            return false;
        }
        if self.important.is_some_and(|i| i != task.important) {
            return false;
        }
        if let Some(needle) = non_blank(&self.text) {
            let needle = needle.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(tag) = non_blank(&self.tag) {
            if task.tag.as_deref() != Some(tag.to_lowercase().as_str()) {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    CreatedDesc,
    /// Undated first, then earliest due.
    DueAsc,
    /// Latest due first, undated last.
    DueDesc,
    /// Manual position, unordered last.
    Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSort(pub String);

impl fmt::Display for UnknownSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown sort '{}' (expected created_desc, due_asc, due_desc or position)",
            self.0
        )
    }
}

impl std::error::Error for UnknownSort {}

impl FromStr for SortOrder {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "created_desc" => Ok(SortOrder::CreatedDesc),
            "due_asc" => Ok(SortOrder::DueAsc),
            "due_desc" => Ok(SortOrder::DueDesc),
            "position" => Ok(SortOrder::Position),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}

pub fn sort_tasks(tasks: &mut [Task], order: SortOrder) {
    match order {
        SortOrder::CreatedDesc => {
            tasks.sort_by_key(|t| Reverse((t.created_at, t.id)));
        }
        SortOrder::DueAsc => {
            // `None < Some(_)` puts undated tasks first.
            tasks.sort_by_key(|t| (t.due_date, t.id));
        }
        SortOrder::DueDesc => {
            tasks.sort_by_key(|t| (t.due_date.is_none(), Reverse(t.due_date), t.id));
        }
        SortOrder::Position => {
            tasks.sort_by(|a, b| ordering::by_position((a.position, a.id), (b.position, b.id)));
        }
    }
}

/// Filter then sort.
pub fn select(tasks: Vec<Task>, filter: &TaskFilter, order: SortOrder) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks.into_iter().filter(|t| filter.matches(t)).collect();
    sort_tasks(&mut selected, order);
    selected
}
