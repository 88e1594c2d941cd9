//! Entry ledger.
//!
//! Append-only record of every validation decision. A ticket's side of the
//! checkpoint is never stored; it is derived from the accepted records here.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::{EntryFilter, Storage};
use crate::types::{EntryRecord, Ticket};

/// Query and append access to the entry ledger.
#[derive(Clone)]
pub struct EntryLedger {
    storage: Arc<dyn Storage>,
}

impl EntryLedger {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Latest accepted record for this ticket within its event.
    ///
    /// Ties on timestamp resolve to the record appended last.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the ledger cannot be queried.
    pub fn most_recent_accept(&self, ticket: &Ticket) -> Result<Option<EntryRecord>> {
        let records = self.accepted(ticket)?;
        Ok(records
            .into_iter()
            .enumerate()
            .max_by_key(|(i, r)| (r.recorded_at, *i))
            .map(|(_, r)| r))
    }

    /// Earliest accepted record for this ticket within its event.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the ledger cannot be queried.
    pub fn first_accept(&self, ticket: &Ticket) -> Result<Option<EntryRecord>> {
        let records = self.accepted(ticket)?;
        Ok(records
            .into_iter()
            .enumerate()
            .min_by_key(|(i, r)| (r.recorded_at, *i))
            .map(|(_, r)| r))
    }

    /// Every record for a barcode across all events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the ledger cannot be queried.
    pub fn history(&self, barcode: &str) -> Result<Vec<EntryRecord>> {
        let mut records = self.storage.entries(&EntryFilter::barcode(barcode))?;
        records.sort_by_key(|r| r.recorded_at);
        Ok(records)
    }

    /// Append a decision.
    ///
    /// # Errors
    ///
    /// Returns `CannotWrite` if the record was not stored. The failure is
    /// never swallowed: the validation attempt that produced it fails too.
    pub fn append(&self, record: &EntryRecord) -> Result<()> {
        self.storage.append_entry(record)
    }

    fn accepted(&self, ticket: &Ticket) -> Result<Vec<EntryRecord>> {
        self.storage
            .entries(&EntryFilter::accepted(&ticket.barcode, ticket.event_id))
    }
}

impl std::fmt::Debug for EntryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryLedger").finish_non_exhaustive()
    }
}
