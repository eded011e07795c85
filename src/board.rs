//! The board: every task and subtask mutation goes through here.
//!
//! Functions take the scoped store handle for the current unit of work
//! (`&mut Tx` for writes, anything implementing `Records` for reads) plus the
//! request time. They validate first, then normalize, then write; an `Err`
//! makes `Store::write` abort the whole transaction.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::due::DueStatus;
use crate::model::{
    normalize_tag, NewSubtask, NewTask, PositionUpdate, Subtask, SubtaskPatch, Task, TaskPatch,
    TaskStatus,
};
use crate::ordering;
use crate::quadrant::{InvalidQuadrant, Quadrant};
use crate::query::{self, SortOrder, TaskFilter, UnknownSort};
use crate::recurrence::{self, Skip};
use crate::store::{Records, StoreError, Tx};

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    TaskNotFound(u64),
    SubtaskNotFound(u64),
    /// Rejected before anything was written.
    Validation(String),
    Store(StoreError),
}

impl From<StoreError> for BoardError {
    fn from(e: StoreError) -> Self {
        BoardError::Store(e)
    }
}

impl From<InvalidQuadrant> for BoardError {
    fn from(e: InvalidQuadrant) -> Self {
        BoardError::Validation(e.to_string())
    }
}

impl From<UnknownSort> for BoardError {
    fn from(e: UnknownSort) -> Self {
        BoardError::Validation(e.to_string())
    }
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardError::TaskNotFound(id) => write!(f, "task {id} not found"),
            BoardError::SubtaskNotFound(id) => write!(f, "subtask {id} not found"),
            BoardError::Validation(msg) => write!(f, "{msg}"),
            BoardError::Store(e) => write!(f, "storage failure: {e}"),
        }
    }
}

impl std::error::Error for BoardError {}

// ── Tasks ──────────────────────────────────────────────────────

/// What an update produced: the task itself, and the next occurrence when
/// the update freshly completed a recurring task.
#[derive(Debug, Clone, PartialEq)]
pub struct Updated {
    pub task: Task,
    pub next_occurrence: Option<Task>,
}

pub fn create_task(tx: &mut Tx, new: NewTask, now: DateTime<Utc>) -> Result<Task, BoardError> {
    let title = required_title(&new.title)?;
    if let Some(n) = new.quadrant {
        Quadrant::try_from(n)?;
    }
    let task = insert_task(tx, NewTask { title, ..new }, now)?;
    info!(task_id = task.id, quadrant = %task.effective_quadrant(), "created task");
    Ok(task)
}

/// Build and store a task from already-validated fields.
fn insert_task(tx: &mut Tx, new: NewTask, now: DateTime<Utc>) -> Result<Task, BoardError> {
    let position = match new.position {
        Some(p) => p,
        None => ordering::next_position(tx.tasks()?.iter().map(|t| t.position)),
    };

    // An explicit quadrant wins over the flags it disagrees with.
    let (urgent, important, quadrant) = match new.quadrant {
        Some(n) => {
            let q = Quadrant::try_from(n)?;
            let (urgent, important) = q.flags();
            (urgent, important, q)
        }
        None => (new.urgent, new.important, Quadrant::resolve(new.urgent, new.important)),
    };

    let task = Task {
        id: tx.next_task_id()?,
        title: new.title,
        description: non_blank(new.description),
        urgent,
        important,
        due_date: new.due_date,
        status: new.status,
        tag: normalize_tag(new.tag),
        position: Some(position),
        quadrant: Some(quadrant),
        recurrence_pattern: new.recurrence_pattern,
        recurrence_end_date: new.recurrence_end_date,
        created_at: now,
        updated_at: now,
        completed_at: (new.status == TaskStatus::Done).then_some(now),
    };
    tx.put_task(&task)?;
    Ok(task)
}

pub fn get_task(records: &impl Records, id: u64) -> Result<Task, BoardError> {
    records.task(id)?.ok_or(BoardError::TaskNotFound(id))
}

pub fn list_tasks(
    records: &impl Records,
    filter: &TaskFilter,
    sort: SortOrder,
) -> Result<Vec<Task>, BoardError> {
    Ok(query::select(records.tasks()?, filter, sort))
}

pub fn update_task(
    tx: &mut Tx,
    id: u64,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> Result<Updated, BoardError> {
    validate_patch(&patch)?;
    let mut task = get_task(tx, id)?;
    let freshly_completed = apply_patch(&mut task, patch, now)?;
    tx.put_task(&task)?;

    let next_occurrence = if freshly_completed {
        info!(task_id = id, "completed task");
        spawn_next_occurrence(tx, &task, now)?
    } else {
        None
    };
    Ok(Updated { task, next_occurrence })
}

pub fn set_position(
    tx: &mut Tx,
    id: u64,
    position: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Task, BoardError> {
    let patch = TaskPatch {
        position: Some(position),
        ..TaskPatch::default()
    };
    Ok(update_task(tx, id, patch, now)?.task)
}

pub fn set_quadrant(
    tx: &mut Tx,
    id: u64,
    quadrant: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Task, BoardError> {
    let patch = TaskPatch {
        quadrant: Some(quadrant),
        ..TaskPatch::default()
    };
    Ok(update_task(tx, id, patch, now)?.task)
}

/// Apply a batch of positions in the caller's transaction. Unknown ids are
/// skipped; only tasks that were actually written are returned.
pub fn set_positions_bulk(
    tx: &mut Tx,
    items: &[PositionUpdate],
    now: DateTime<Utc>,
) -> Result<Vec<Task>, BoardError> {
    let mut updated = Vec::new();
    for item in ordering::dedup_batch(items) {
        let Some(mut task) = tx.task(item.id)? else {
            debug!(task_id = item.id, "reorder skipped unknown task");
            continue;
        };
        let patch = TaskPatch {
            position: Some(item.position),
            ..TaskPatch::default()
        };
        apply_patch(&mut task, patch, now)?;
        tx.put_task(&task)?;
        updated.push(task);
    }
    info!(requested = items.len(), updated = updated.len(), "reordered tasks");
    Ok(updated)
}

pub fn delete_task(tx: &mut Tx, id: u64) -> Result<(), BoardError> {
    if !tx.remove_task(id)? {
        return Err(BoardError::TaskNotFound(id));
    }
    info!(task_id = id, "deleted task");
    Ok(())
}

fn validate_patch(patch: &TaskPatch) -> Result<(), BoardError> {
    if let Some(title) = &patch.title {
        required_title(title)?;
    }
    if let Some(Some(n)) = patch.quadrant {
        Quadrant::try_from(n)?;
    }
    Ok(())
}

/// Write `patch` into `task`, keep the quadrant and flags in agreement, and
/// stamp timestamps. Returns true when this write is the task's first
/// completion.
fn apply_patch(task: &mut Task, patch: TaskPatch, now: DateTime<Utc>) -> Result<bool, BoardError> {
    if let Some(title) = patch.title {
        task.title = required_title(&title)?;
    }
    if let Some(description) = patch.description {
        task.description = non_blank(description);
    }
    if let Some(urgent) = patch.urgent {
        task.urgent = urgent;
    }
    if let Some(important) = patch.important {
        task.important = important;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(tag) = patch.tag {
        task.tag = normalize_tag(tag);
    }
    if let Some(position) = patch.position {
        task.position = position;
    }
    if let Some(pattern) = patch.recurrence_pattern {
        task.recurrence_pattern = pattern;
    }
    if let Some(end) = patch.recurrence_end_date {
        task.recurrence_end_date = end;
    }

    match patch.quadrant {
        Some(Some(n)) => {
            let q = Quadrant::try_from(n)?;
            (task.urgent, task.important) = q.flags();
            task.quadrant = Some(q);
        }
        // Clearing touches the quadrant only.
        Some(None) => task.quadrant = None,
        None => task.quadrant = Some(Quadrant::resolve(task.urgent, task.important)),
    }

    task.updated_at = now;

    // completed_at is never cleared, so reopening and completing again is not
    // a fresh completion.
    let fresh = task.is_done() && task.completed_at.is_none();
    if fresh {
        task.completed_at = Some(now);
    }
    Ok(fresh)
}

fn spawn_next_occurrence(
    tx: &mut Tx,
    task: &Task,
    now: DateTime<Utc>,
) -> Result<Option<Task>, BoardError> {
    match recurrence::next_occurrence(task) {
        Ok(new) => {
            let next = insert_task(tx, new, now)?;
            info!(task_id = task.id, next_id = next.id, due = ?next.due_date, "spawned next occurrence");
            Ok(Some(next))
        }
        Err(Skip::OutOfRange) => {
            warn!(task_id = task.id, due = ?task.due_date, "next occurrence date out of range");
            Ok(None)
        }
        Err(skip) => {
            debug!(task_id = task.id, ?skip, "no next occurrence");
            Ok(None)
        }
    }
}

fn required_title(title: &str) -> Result<String, BoardError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BoardError::Validation("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

// ── Aggregates ─────────────────────────────────────────────────

pub fn count(records: &impl Records) -> Result<usize, BoardError> {
    Ok(records.tasks()?.len())
}

pub fn max_position(records: &impl Records) -> Result<Option<i64>, BoardError> {
    Ok(ordering::max_position(records.tasks()?.iter().map(|t| t.position)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total: usize,
    pub done: usize,
}

pub fn aggregate_stats(records: &impl Records) -> Result<Totals, BoardError> {
    let tasks = records.tasks()?;
    Ok(Totals {
        total: tasks.len(),
        done: tasks.iter().filter(|t| t.is_done()).count(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuadrantCounts {
    pub q1: usize,
    pub q2: usize,
    pub q3: usize,
    pub q4: usize,
}

impl QuadrantCounts {
    fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = QuadrantCounts::default();
        for task in tasks {
            match task.effective_quadrant() {
                Quadrant::DoFirst => counts.q1 += 1,
                Quadrant::Schedule => counts.q2 += 1,
                Quadrant::Delegate => counts.q3 += 1,
                Quadrant::Eliminate => counts.q4 += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.q1 + self.q2 + self.q3 + self.q4
    }
}

pub fn eisenhower_counts(
    records: &impl Records,
    status: Option<TaskStatus>,
) -> Result<QuadrantCounts, BoardError> {
    let tasks = records.tasks()?;
    Ok(QuadrantCounts::tally(
        tasks.iter().filter(|t| status.map_or(true, |s| t.status == s)),
    ))
}

pub fn completed_since(records: &impl Records, since: DateTime<Utc>) -> Result<usize, BoardError> {
    Ok(records
        .tasks()?
        .iter()
        .filter(|t| t.is_done() && t.completed_at.is_some_and(|at| at >= since))
        .count())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub done: usize,
    pub todo: usize,
    /// Percentage rounded half to even, 0 for an empty board.
    pub completion_rate: u32,
    pub quadrants_all: QuadrantCounts,
    pub quadrants_open: QuadrantCounts,
    pub done_last_7_days: usize,
}

pub fn stats(records: &impl Records, now: DateTime<Utc>) -> Result<Stats, BoardError> {
    let Totals { total, done } = aggregate_stats(records)?;
    let completion_rate = if total == 0 {
        0
    } else {
        (done as f64 * 100.0 / total as f64).round_ties_even() as u32
    };
    Ok(Stats {
        total,
        done,
        todo: total - done,
        completion_rate,
        quadrants_all: eisenhower_counts(records, None)?,
        quadrants_open: eisenhower_counts(records, Some(TaskStatus::Todo))?,
        done_last_7_days: completed_since(records, now - Duration::days(7))?,
    })
}

// ── Views ──────────────────────────────────────────────────────

/// Open tasks by quadrant, each in position order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    pub quadrants: [Vec<Task>; 4],
}

pub fn matrix(records: &impl Records) -> Result<Matrix, BoardError> {
    let mut matrix = Matrix::default();
    let open = list_tasks(records, &TaskFilter::status(TaskStatus::Todo), SortOrder::Position)?;
    for task in open {
        matrix.quadrants[task.effective_quadrant().index()].push(task);
    }
    Ok(matrix)
}

/// Listing split by due status. Done tasks get their own section whatever
/// their due date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agenda {
    pub overdue: Vec<Task>,
    pub today: Vec<Task>,
    pub soon: Vec<Task>,
    pub later: Vec<Task>,
    pub undated: Vec<Task>,
    pub done: Vec<Task>,
}

pub fn agenda(
    records: &impl Records,
    filter: &TaskFilter,
    sort: SortOrder,
    today: NaiveDate,
    soon_window_days: u64,
) -> Result<Agenda, BoardError> {
    let mut agenda = Agenda::default();
    for task in list_tasks(records, filter, sort)? {
        if task.is_done() {
            agenda.done.push(task);
            continue;
        }
        let section = match DueStatus::classify(task.due_date, today, soon_window_days) {
            DueStatus::Overdue => &mut agenda.overdue,
            DueStatus::Today => &mut agenda.today,
            DueStatus::Soon => &mut agenda.soon,
            DueStatus::Later => &mut agenda.later,
            DueStatus::None => &mut agenda.undated,
        };
        section.push(task);
    }
    Ok(agenda)
}

// ── Subtasks ───────────────────────────────────────────────────

pub fn create_subtask(
    tx: &mut Tx,
    task_id: u64,
    new: NewSubtask,
    now: DateTime<Utc>,
) -> Result<Subtask, BoardError> {
    let title = required_title(&new.title)?;
    get_task(tx, task_id)?;

    let position = match new.position {
        Some(p) => p,
        None => ordering::next_position(tx.subtasks_of(task_id)?.iter().map(|s| s.position)),
    };
    let subtask = Subtask {
        id: tx.next_subtask_id()?,
        task_id,
        title,
        status: new.status,
        position: Some(position),
        created_at: now,
    };
    tx.put_subtask(&subtask)?;
    debug!(task_id, subtask_id = subtask.id, "created subtask");
    Ok(subtask)
}

/// Subtasks of `task_id` in position order. Empty for an unknown task.
pub fn list_subtasks(records: &impl Records, task_id: u64) -> Result<Vec<Subtask>, BoardError> {
    let mut subtasks = records.subtasks_of(task_id)?;
    subtasks.sort_by(|a, b| ordering::by_position((a.position, a.id), (b.position, b.id)));
    Ok(subtasks)
}

/// A subtask addressed through the wrong parent is reported as missing.
pub fn get_subtask(records: &impl Records, task_id: u64, id: u64) -> Result<Subtask, BoardError> {
    records
        .subtask(id)?
        .filter(|s| s.task_id == task_id)
        .ok_or(BoardError::SubtaskNotFound(id))
}

pub fn update_subtask(
    tx: &mut Tx,
    task_id: u64,
    id: u64,
    patch: SubtaskPatch,
) -> Result<Subtask, BoardError> {
    let title = patch.title.as_deref().map(required_title).transpose()?;
    let mut subtask = get_subtask(tx, task_id, id)?;
    if let Some(title) = title {
        subtask.title = title;
    }
    if let Some(status) = patch.status {
        subtask.status = status;
    }
    if let Some(position) = patch.position {
        subtask.position = position;
    }
    tx.put_subtask(&subtask)?;
    Ok(subtask)
}

pub fn delete_subtask(tx: &mut Tx, task_id: u64, id: u64) -> Result<(), BoardError> {
    get_subtask(tx, task_id, id)?;
    tx.remove_subtask(id)?;
    debug!(task_id, subtask_id = id, "deleted subtask");
    Ok(())
}

/// Bulk reorder inside one parent. Unknown subtasks and subtasks of other
/// tasks are skipped.
pub fn set_subtask_positions_bulk(
    tx: &mut Tx,
    task_id: u64,
    items: &[PositionUpdate],
) -> Result<Vec<Subtask>, BoardError> {
    let mut updated = Vec::new();
    for item in ordering::dedup_batch(items) {
        let Some(mut subtask) = tx.subtask(item.id)?.filter(|s| s.task_id == task_id) else {
            debug!(task_id, subtask_id = item.id, "reorder skipped subtask");
            continue;
        };
        subtask.position = item.position;
        tx.put_subtask(&subtask)?;
        updated.push(subtask);
    }
    Ok(updated)
}

// ── Tests ──────────────────────────────────────────────────────
