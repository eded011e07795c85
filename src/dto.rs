//! JSON request and response bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::board::{Agenda, Matrix};
use crate::due::DueStatus;
use crate::model::{
    NewSubtask, NewTask, PositionUpdate, RecurrencePattern, Subtask, SubtaskPatch, Task, TaskPatch,
    TaskStatus,
};
use crate::query::{SortOrder, TaskFilter, UnknownSort};

/// Distinguishes a missing field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// Requests

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    pub tag: Option<String>,
    pub position: Option<i64>,
    pub quadrant: Option<i64>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_end_date: Option<NaiveDate>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(r: CreateTaskRequest) -> Self {
        NewTask {
            title: r.title,
            description: r.description,
            urgent: r.urgent,
            important: r.important,
            due_date: r.due_date,
            status: r.status,
            tag: r.tag,
            position: r.position,
            quadrant: r.quadrant,
            recurrence_pattern: r.recurrence_pattern,
            recurrence_end_date: r.recurrence_end_date,
        }
    }
}

/// Partial update: absent fields stay as they are, `null` clears.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub urgent: Option<bool>,
    pub important: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub tag: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub position: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub quadrant: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub recurrence_pattern: Option<Option<RecurrencePattern>>,
    #[serde(default, deserialize_with = "nullable")]
    pub recurrence_end_date: Option<Option<NaiveDate>>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(r: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: r.title,
            description: r.description,
            urgent: r.urgent,
            important: r.important,
            due_date: r.due_date,
            status: r.status,
            tag: r.tag,
            position: r.position,
            quadrant: r.quadrant,
            recurrence_pattern: r.recurrence_pattern,
            recurrence_end_date: r.recurrence_end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuadrantRequest {
    pub quadrant: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<PositionUpdate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<TaskStatus>,
    pub urgent: Option<bool>,
    pub important: Option<bool>,
    pub q: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn into_parts(self) -> Result<(TaskFilter, SortOrder), UnknownSort> {
        let sort = match self.sort.as_deref() {
            Some(s) => s.parse()?,
            None => SortOrder::default(),
        };
        let filter = TaskFilter {
            status: self.status,
            urgent: self.urgent,
            important: self.important,
            text: self.q,
            tag: self.tag,
        };
        Ok((filter, sort))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    pub position: Option<i64>,
}

impl From<CreateSubtaskRequest> for NewSubtask {
    fn from(r: CreateSubtaskRequest) -> Self {
        NewSubtask {
            title: r.title,
            status: r.status,
            position: r.position,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub position: Option<Option<i64>>,
}

impl From<UpdateSubtaskRequest> for SubtaskPatch {
    fn from(r: UpdateSubtaskRequest) -> Self {
        SubtaskPatch {
            title: r.title,
            status: r.status,
            position: r.position,
        }
    }
}

// Responses

/// A task plus its display-only due status.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub due_status: DueStatus,
}

/// Turns stored tasks into responses for a given day.
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    pub today: NaiveDate,
    pub soon_window_days: u64,
}

impl Presenter {
    pub fn task(&self, task: Task) -> TaskResponse {
        let due_status = DueStatus::classify(task.due_date, self.today, self.soon_window_days);
        TaskResponse { task, due_status }
    }

    pub fn tasks(&self, tasks: Vec<Task>) -> Vec<TaskResponse> {
        tasks.into_iter().map(|t| self.task(t)).collect()
    }

    pub fn matrix(&self, matrix: Matrix) -> MatrixResponse {
        let [q1, q2, q3, q4] = matrix.quadrants;
        MatrixResponse {
            q1: self.tasks(q1),
            q2: self.tasks(q2),
            q3: self.tasks(q3),
            q4: self.tasks(q4),
        }
    }

    pub fn agenda(&self, agenda: Agenda) -> AgendaResponse {
        AgendaResponse {
            overdue: self.tasks(agenda.overdue),
            today: self.tasks(agenda.today),
            soon: self.tasks(agenda.soon),
            later: self.tasks(agenda.later),
            none: self.tasks(agenda.undated),
            done: self.tasks(agenda.done),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatrixResponse {
    pub q1: Vec<TaskResponse>,
    pub q2: Vec<TaskResponse>,
    pub q3: Vec<TaskResponse>,
    pub q4: Vec<TaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct AgendaResponse {
    pub overdue: Vec<TaskResponse>,
    pub today: Vec<TaskResponse>,
    pub soon: Vec<TaskResponse>,
    pub later: Vec<TaskResponse>,
    pub none: Vec<TaskResponse>,
    pub done: Vec<TaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct SubtaskReorderResponse {
    pub updated: Vec<u64>,
}

impl From<Vec<Subtask>> for SubtaskReorderResponse {
    fn from(subtasks: Vec<Subtask>) -> Self {
        SubtaskReorderResponse {
            updated: subtasks.into_iter().map(|s| s.id).collect(),
        }
    }
}
