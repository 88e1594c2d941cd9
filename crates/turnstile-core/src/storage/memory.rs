//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{read_failed, write_failed, Catalog, EntryFilter, Storage};
use crate::error::Result;
use crate::types::{EntryRecord, Event, EventId, Group, GroupId, MasterKey, Terminal, Ticket};

/// Storage held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    catalog: RwLock<Catalog>,
    ledger: RwLock<Vec<EntryRecord>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with a catalog and ledger.
    #[must_use]
    pub const fn with_contents(catalog: Catalog, ledger: Vec<EntryRecord>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            ledger: RwLock::new(ledger),
        }
    }

    /// Copy of the current catalog.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the catalog lock is poisoned.
    pub fn snapshot(&self) -> Result<Catalog> {
        Ok(self.catalog.read().map_err(read_failed)?.clone())
    }

    /// Consume the store and return its catalog.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the catalog lock is poisoned.
    pub fn into_catalog(self) -> Result<Catalog> {
        self.catalog.into_inner().map_err(read_failed)
    }

    /// Swap in a whole catalog at once.
    pub(crate) fn replace_catalog(&self, catalog: Catalog) -> Result<()> {
        self.write(|current| *current = catalog)
    }

    /// Number of ledger records.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the ledger lock is poisoned.
    pub fn ledger_len(&self) -> Result<usize> {
        Ok(self.ledger.read().map_err(read_failed)?.len())
    }

    fn read<T>(&self, f: impl FnOnce(&Catalog) -> T) -> Result<T> {
        let catalog = self.catalog.read().map_err(read_failed)?;
        Ok(f(&catalog))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Catalog) -> T) -> Result<T> {
        let mut catalog = self.catalog.write().map_err(write_failed)?;
        Ok(f(&mut catalog))
    }
}

impl Storage for MemoryStorage {
    fn events(&self) -> Result<Vec<Event>> {
        self.read(|c| c.events.clone())
    }

    fn event(&self, id: EventId) -> Result<Option<Event>> {
        self.read(|c| c.events.iter().find(|e| e.id == id).cloned())
    }

    fn upsert_event(&self, event: &Event) -> Result<()> {
        self.write(|c| match c.events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event.clone(),
            None => c.events.push(event.clone()),
        })
    }

    fn find_ticket(&self, barcode: &str, event_ids: Option<&[EventId]>) -> Result<Option<Ticket>> {
        self.read(|c| {
            c.tickets
                .iter()
                .find(|t| {
                    t.barcode == barcode
                        && event_ids.map_or(true, |ids| ids.contains(&t.event_id))
                })
                .cloned()
        })
    }

    fn count_tickets(&self, event_id: EventId) -> Result<u64> {
        self.read(|c| c.tickets.iter().filter(|t| t.event_id == event_id).count() as u64)
    }

    fn upsert_tickets(&self, tickets: &[Ticket]) -> Result<()> {
        self.write(|c| {
            let mut index: HashMap<(i64, EventId), usize> = c
                .tickets
                .iter()
                .enumerate()
                .map(|(i, t)| ((t.ticket_id, t.event_id), i))
                .collect();
            for ticket in tickets {
                let key = (ticket.ticket_id, ticket.event_id);
                if let Some(&i) = index.get(&key) {
                    c.tickets[i] = ticket.clone();
                } else {
                    index.insert(key, c.tickets.len());
                    c.tickets.push(ticket.clone());
                }
            }
        })
    }

    fn remove_stale_tickets(
        &self,
        event_id: EventId,
        source: &str,
        older_than: DateTime<Utc>,
    ) -> Result<usize> {
        self.write(|c| {
            let before = c.tickets.len();
            c.tickets.retain(|t| {
                !(t.event_id == event_id
                    && t.source == source
                    && t.last_update.map_or(true, |at| at < older_than))
            });
            before - c.tickets.len()
        })
    }

    fn groups(&self) -> Result<Vec<Group>> {
        self.read(|c| c.groups.clone())
    }

    fn insert_group(&self, group: &Group) -> Result<()> {
        self.write(|c| c.groups.push(group.clone()))
    }

    fn upsert_group(&self, group: &Group) -> Result<()> {
        self.write(|c| match c.groups.iter_mut().find(|g| g.name == group.name) {
            Some(existing) => *existing = group.clone(),
            None => c.groups.push(group.clone()),
        })
    }

    fn remove_group(&self, id: GroupId) -> Result<bool> {
        self.write(|c| {
            let before = c.groups.len();
            c.groups.retain(|g| g.id != id);
            before != c.groups.len()
        })
    }

    fn terminals(&self) -> Result<Vec<Terminal>> {
        self.read(|c| c.terminals.clone())
    }

    fn insert_terminal(&self, terminal: &Terminal) -> Result<()> {
        self.write(|c| c.terminals.push(terminal.clone()))
    }

    fn update_terminal(&self, terminal: &Terminal) -> Result<bool> {
        self.write(|c| {
            c.terminals
                .iter_mut()
                .find(|t| t.id == terminal.id)
                .map(|existing| *existing = terminal.clone())
                .is_some()
        })
    }

    fn master_keys(&self) -> Result<Vec<MasterKey>> {
        self.read(|c| c.master_keys.clone())
    }

    fn insert_master_key(&self, key: &MasterKey) -> Result<()> {
        self.write(|c| c.master_keys.push(key.clone()))
    }

    fn entries(&self, filter: &EntryFilter<'_>) -> Result<Vec<EntryRecord>> {
        let ledger = self.ledger.read().map_err(read_failed)?;
        Ok(ledger.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    fn append_entry(&self, record: &EntryRecord) -> Result<()> {
        self.ledger.write().map_err(write_failed)?.push(record.clone());
        Ok(())
    }
}
