//! Persistence collaborator.
//!
//! The validation engine talks to its backing store only through the
//! [`Storage`] trait. Two backends ship with the crate:
//!
//! - [`MemoryStorage`] keeps everything behind `RwLock`s; used by tests and
//!   by deployments that re-import the catalog on every start.
//! - [`FileStorage`] keeps the catalog as a JSON snapshot and the entry
//!   ledger as an append-only JSON-lines file.
//!
//! Every read failure surfaces as [`TurnstileError::CannotRead`] and every
//! write failure as [`TurnstileError::CannotWrite`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TurnstileError};
use crate::types::{
    EntryRecord, Event, EventId, Group, GroupId, MasterKey, ResultCode, Terminal, TerminalId,
    Ticket,
};

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Selects ledger records.
#[derive(Debug, Clone, Copy)]
pub struct EntryFilter<'a> {
    /// Barcode to match.
    pub barcode: &'a str,
    /// Restrict to one event.
    pub event_id: Option<EventId>,
    /// Restrict to one result code.
    pub result: Option<ResultCode>,
}

impl<'a> EntryFilter<'a> {
    /// All records for a barcode.
    #[must_use]
    pub const fn barcode(barcode: &'a str) -> Self {
        Self {
            barcode,
            event_id: None,
            result: None,
        }
    }

    /// Accepted records for a barcode within one event.
    #[must_use]
    pub const fn accepted(barcode: &'a str, event_id: EventId) -> Self {
        Self {
            barcode,
            event_id: Some(event_id),
            result: Some(ResultCode::Accept),
        }
    }

    /// Returns `true` if `record` is selected.
    #[must_use]
    pub fn matches(&self, record: &EntryRecord) -> bool {
        record.barcode == self.barcode
            && self.event_id.map_or(true, |id| record.event_id == id)
            && self.result.map_or(true, |result| record.result == result)
    }
}

/// Everything except the ledger, as one serializable document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Known events.
    pub events: Vec<Event>,
    /// Known tickets.
    pub tickets: Vec<Ticket>,
    /// Access groups.
    pub groups: Vec<Group>,
    /// Registered terminals.
    pub terminals: Vec<Terminal>,
    /// Master keys.
    pub master_keys: Vec<MasterKey>,
}

/// Backing store for catalog entities and the entry ledger.
///
/// Implementations must be safe to share between request handlers. Ledger
/// appends must be atomic per record: a reader never observes half a record.
pub trait Storage: Send + Sync {
    /// All events.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn events(&self) -> Result<Vec<Event>>;

    /// Insert or replace an event keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn upsert_event(&self, event: &Event) -> Result<()>;

    /// First ticket with this barcode, restricted to `event_ids` when given.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn find_ticket(&self, barcode: &str, event_ids: Option<&[EventId]>) -> Result<Option<Ticket>>;

    /// Number of tickets for an event.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn count_tickets(&self, event_id: EventId) -> Result<u64>;

    /// Insert or replace tickets keyed by `(ticket_id, event_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn upsert_tickets(&self, tickets: &[Ticket]) -> Result<()>;

    /// Remove tickets of `event_id` from `source` last updated before `older_than`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn remove_stale_tickets(
        &self,
        event_id: EventId,
        source: &str,
        older_than: DateTime<Utc>,
    ) -> Result<usize>;

    /// All groups.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn groups(&self) -> Result<Vec<Group>>;

    /// Insert a new group.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn insert_group(&self, group: &Group) -> Result<()>;

    /// Insert or replace a group keyed by name.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn upsert_group(&self, group: &Group) -> Result<()>;

    /// Remove a group; returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn remove_group(&self, id: GroupId) -> Result<bool>;

    /// All terminals.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn terminals(&self) -> Result<Vec<Terminal>>;

    /// Insert a new terminal.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn insert_terminal(&self, terminal: &Terminal) -> Result<()>;

    /// Replace a terminal by id; returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn update_terminal(&self, terminal: &Terminal) -> Result<bool>;

    /// All master keys.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn master_keys(&self) -> Result<Vec<MasterKey>>;

    /// Insert a master key.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the store rejects the write.
    fn insert_master_key(&self, key: &MasterKey) -> Result<()>;

    /// Ledger records selected by `filter`, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn entries(&self, filter: &EntryFilter<'_>) -> Result<Vec<EntryRecord>>;

    /// Append one record to the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotWrite`] if the record was not stored.
    fn append_entry(&self, record: &EntryRecord) -> Result<()>;

    /// Event by id.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.events()?.into_iter().find(|event| event.id == id))
    }

    /// Groups whose id is in `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn groups_by_ids(&self, ids: &[GroupId]) -> Result<Vec<Group>> {
        Ok(self
            .groups()?
            .into_iter()
            .filter(|group| ids.contains(&group.id))
            .collect())
    }

    /// Terminal by id.
    ///
    /// # Errors
    ///
    /// Returns [`TurnstileError::CannotRead`] if the store cannot be queried.
    fn terminal(&self, id: TerminalId) -> Result<Option<Terminal>> {
        Ok(self.terminals()?.into_iter().find(|terminal| terminal.id == id))
    }
}

pub(crate) fn read_failed(cause: impl std::fmt::Display) -> TurnstileError {
    TurnstileError::CannotRead(cause.to_string())
}

pub(crate) fn write_failed(cause: impl std::fmt::Display) -> TurnstileError {
    TurnstileError::CannotWrite(cause.to_string())
}
