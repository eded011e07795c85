//! Next-occurrence generation for recurring tasks.
//!
//! Only one occurrence is ever materialized ahead: completing a recurring
//! task yields its successor, and completing the successor yields the next.
//!
//! Monthly steps keep the day of month and clamp to the last day of the
//! target month (Jan 31 → Feb 28, or Feb 29 in a leap year).

use chrono::{Days, Months, NaiveDate};

use crate::model::{NewTask, RecurrencePattern, Task, TaskStatus};

/// `due` advanced by one step of `pattern`. `None` if the date would leave
/// chrono's representable range.
pub fn next_due(due: NaiveDate, pattern: RecurrencePattern) -> Option<NaiveDate> {
    match pattern {
        RecurrencePattern::Daily => due.checked_add_days(Days::new(1)),
        RecurrencePattern::Weekly => due.checked_add_days(Days::new(7)),
        RecurrencePattern::Monthly => due.checked_add_months(Months::new(1)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotRecurring,
    NoDueDate,
    /// The step could not be computed.
    OutOfRange,
    PastEndDate,
}

/// The task to create after `task` is freshly completed, or why there is none.
///
/// The caller decides whether the completion is fresh; this only looks at the
/// recurrence fields.
pub fn next_occurrence(task: &Task) -> Result<NewTask, Skip> {
    let pattern = task.recurrence_pattern.ok_or(Skip::NotRecurring)?;
    let due = task.due_date.ok_or(Skip::NoDueDate)?;
    let next = next_due(due, pattern).ok_or(Skip::OutOfRange)?;

    if task.recurrence_end_date.is_some_and(|end| next > end) {
        return Err(Skip::PastEndDate);
    }

    Ok(NewTask {
        title: task.title.clone(),
        description: task.description.clone(),
        urgent: task.urgent,
        important: task.important,
        due_date: Some(next),
        status: TaskStatus::Todo,
        tag: task.tag.clone(),
        position: None,
        quadrant: None,
        recurrence_pattern: Some(pattern),
        recurrence_end_date: task.recurrence_end_date,
    })
}
