//! Board ↔ redb persistence.
//!
//! Every request is one unit of work: `Store::write` opens a write
//! transaction, hands a `Tx` to the caller, and commits only if the caller
//! returns `Ok`. Reads go through `Store::read` and a `Snapshot`. Nothing is
//! cached between calls; redb is the runtime truth.

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Subtask, Task};

const TASKS: TableDefinition<u64, &[u8]> = TableDefinition::new("tasks");
const SUBTASKS: TableDefinition<u64, &[u8]> = TableDefinition::new("subtasks");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const TASK_ID_COUNTER: &str = "last_task_id";
const SUBTASK_ID_COUNTER: &str = "last_subtask_id";

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;
        Store::init(db)
    }

    /// A throwaway database that lives in memory. Used by tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Store::init(db)
    }

    fn init(db: Database) -> Result<Self, StoreError> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(TASKS)?;
            let _ = txn.open_table(SUBTASKS)?;
            let _ = txn.open_table(META)?;
        }
        txn.commit()?;
        Ok(Store { db: Arc::new(db) })
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<T, E>(&self, f: impl FnOnce(&Snapshot) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_read().map_err(StoreError::from)?;
        f(&Snapshot { txn })
    }

    /// Run `f` inside one write transaction. Commits on `Ok`, aborts on `Err`.
    pub fn write<T, E>(&self, f: impl FnOnce(&mut Tx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let mut tx = Tx { txn };
        match f(&mut tx) {
            Ok(value) => {
                tx.txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = tx.txn.abort() {
                    tracing::warn!(error = %abort, "aborting write transaction failed");
                }
                Err(e)
            }
        }
    }
}

// ── Reading ────────────────────────────────────────────────────

/// Read access shared by snapshots and write transactions.
pub trait Records {
    fn task(&self, id: u64) -> Result<Option<Task>, StoreError>;
    /// All tasks, in id order.
    fn tasks(&self) -> Result<Vec<Task>, StoreError>;
    fn subtask(&self, id: u64) -> Result<Option<Subtask>, StoreError>;
    /// Subtasks of one task, in id order.
    fn subtasks_of(&self, task_id: u64) -> Result<Vec<Subtask>, StoreError>;
}

pub struct Snapshot {
    txn: ReadTransaction,
}

impl Records for Snapshot {
    fn task(&self, id: u64) -> Result<Option<Task>, StoreError> {
        get_record(&self.txn.open_table(TASKS)?, id)
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        all_records(&self.txn.open_table(TASKS)?)
    }

    fn subtask(&self, id: u64) -> Result<Option<Subtask>, StoreError> {
        get_record(&self.txn.open_table(SUBTASKS)?, id)
    }

    fn subtasks_of(&self, task_id: u64) -> Result<Vec<Subtask>, StoreError> {
        let all: Vec<Subtask> = all_records(&self.txn.open_table(SUBTASKS)?)?;
        Ok(all.into_iter().filter(|s| s.task_id == task_id).collect())
    }
}

// ── Writing ────────────────────────────────────────────────────

/// A live write transaction. Changes become visible when `Store::write`
/// commits.
pub struct Tx {
    txn: WriteTransaction,
}

impl Tx {
    pub fn next_task_id(&mut self) -> Result<u64, StoreError> {
        self.bump(TASK_ID_COUNTER)
    }

    pub fn next_subtask_id(&mut self) -> Result<u64, StoreError> {
        self.bump(SUBTASK_ID_COUNTER)
    }

    /// Ids come from counters, never from table contents, so a deleted id
    /// is never handed out again.
    fn bump(&mut self, counter: &str) -> Result<u64, StoreError> {
        let mut meta = self.txn.open_table(META)?;
        let last = meta.get(counter)?.map(|v| v.value()).unwrap_or(0);
        let next = last + 1;
        meta.insert(counter, next)?;
        Ok(next)
    }

    /// Insert or overwrite a task.
    pub fn put_task(&mut self, task: &Task) -> Result<(), StoreError> {
        let bytes = encode(task)?;
        let mut tasks = self.txn.open_table(TASKS)?;
        tasks.insert(task.id, bytes.as_slice())?;
        Ok(())
    }

    /// Remove a task and every subtask it owns. Returns false if the task
    /// did not exist.
    pub fn remove_task(&mut self, id: u64) -> Result<bool, StoreError> {
        let existed = {
            let mut tasks = self.txn.open_table(TASKS)?;
            let removed = tasks.remove(id)?;
            removed.is_some()
        };
        if !existed {
            return Ok(false);
        }

        let orphans: Vec<u64> = self.subtasks_of(id)?.iter().map(|s| s.id).collect();
        let mut subtasks = self.txn.open_table(SUBTASKS)?;
        for sid in &orphans {
            subtasks.remove(*sid)?;
        }
        tracing::debug!(task_id = id, subtasks = orphans.len(), "removed task");
        Ok(true)
    }

    pub fn put_subtask(&mut self, subtask: &Subtask) -> Result<(), StoreError> {
        let bytes = encode(subtask)?;
        let mut subtasks = self.txn.open_table(SUBTASKS)?;
        subtasks.insert(subtask.id, bytes.as_slice())?;
        Ok(())
    }

    pub fn remove_subtask(&mut self, id: u64) -> Result<bool, StoreError> {
        let mut subtasks = self.txn.open_table(SUBTASKS)?;
        let removed = subtasks.remove(id)?;
        Ok(removed.is_some())
    }
}

impl Records for Tx {
    fn task(&self, id: u64) -> Result<Option<Task>, StoreError> {
        get_record(&self.txn.open_table(TASKS)?, id)
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        all_records(&self.txn.open_table(TASKS)?)
    }

    fn subtask(&self, id: u64) -> Result<Option<Subtask>, StoreError> {
        get_record(&self.txn.open_table(SUBTASKS)?, id)
    }

    fn subtasks_of(&self, task_id: u64) -> Result<Vec<Subtask>, StoreError> {
        let all: Vec<Subtask> = all_records(&self.txn.open_table(SUBTASKS)?)?;
        Ok(all.into_iter().filter(|s| s.task_id == task_id).collect())
    }
}

// ── Codec ──────────────────────────────────────────────────────

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(record).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

fn get_record<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>, StoreError> {
    match table.get(id)? {
        Some(data) => Ok(Some(decode(data.value())?)),
        None => Ok(None),
    }
}

fn all_records<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<T>, StoreError> {
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(decode(value.value())?);
    }
    Ok(records)
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Redb(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into StoreError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Redb(e) => write!(f, "redb: {e}"),
            StoreError::Decode(e) => write!(f, "decode: {e}"),
            StoreError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ── Tests ──────────────────────────────────────────────────────
