//! Eisenhower-matrix task server: tasks with urgency/importance flags,
//! subtasks, recurrence, and a JSON API over a redb file.

pub mod quadrant;
pub mod model;
pub mod ordering;
pub mod recurrence;
pub mod due;
pub mod query;
pub mod store;
pub mod board;
pub mod settings;
pub mod dto;
pub mod api;

pub use api::{router, AppState, SharedState};
pub use settings::Settings;
pub use store::Store;
