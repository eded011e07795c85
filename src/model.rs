use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::quadrant::Quadrant;

// ── Entity types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

/// A task on the board.
///
/// `quadrant` is stored alongside the flags it derives from. The board keeps
/// both in agreement; `None` only ever means the caller cleared it explicitly.
///
/// Records are postcard-encoded, so no field may be skipped on serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub urgent: bool,
    pub important: bool,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    /// Lowercased, never empty.
    pub tag: Option<String>,
    /// Manual ordering. `None` sorts after every ordered task.
    pub position: Option<i64>,
    pub quadrant: Option<Quadrant>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    /// Inclusive upper bound for generated occurrences.
    pub recurrence_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stamped on the first transition into Done and never cleared.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Stored quadrant, or the one the flags resolve to when it was cleared.
    pub fn effective_quadrant(&self) -> Quadrant {
        self.quadrant
            .unwrap_or_else(|| Quadrant::resolve(self.urgent, self.important))
    }
}

/// A checklist item owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u64,
    pub task_id: u64,
    pub title: String,
    pub status: TaskStatus,
    /// Ordering within the parent task only.
    pub position: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a task that does not exist yet. The board turns this into a
/// `Task` by assigning id, timestamps, position and quadrant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub urgent: bool,
    pub important: bool,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub tag: Option<String>,
    pub position: Option<i64>,
    pub quadrant: Option<i64>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_end_date: Option<NaiveDate>,
}

/// A partial task update. Outer `None` leaves a field untouched; for
/// nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub urgent: Option<bool>,
    pub important: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub status: Option<TaskStatus>,
    pub tag: Option<Option<String>>,
    pub position: Option<Option<i64>>,
    pub quadrant: Option<Option<i64>>,
    pub recurrence_pattern: Option<Option<RecurrencePattern>>,
    pub recurrence_end_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSubtask {
    pub title: String,
    pub status: TaskStatus,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub position: Option<Option<i64>>,
}

/// One entry of a bulk reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: u64,
    pub position: Option<i64>,
}

// ── Normalization ─────────────────────────────────────────────

/// Trim and lowercase a tag; blank tags become `None`.
pub fn normalize_tag(tag: Option<String>) -> Option<String> {
    tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_case_folded() {
        assert_eq!(normalize_tag(Some("Work".into())), Some("work".into()));
        assert_eq!(normalize_tag(Some("  Home Office ".into())), Some("home office".into()));
    }

    #[test]
    fn blank_tags_become_absent() {
        assert_eq!(normalize_tag(Some(String::new())), None);
        assert_eq!(normalize_tag(Some("   ".into())), None);
        assert_eq!(normalize_tag(None), None);
    }

    #[test]
    fn status_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&TaskStatus::Done).unwrap(), "\"done\"");
        let p: RecurrencePattern = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(p, RecurrencePattern::Monthly);
    }
}
