//! File-backed storage.
//!
//! Layout under the data directory:
//!
//! ```text
//! catalog.json   events, tickets, groups, terminals, master keys
//! entries.jsonl  entry ledger, one JSON record per line, append-only
//! ```
//!
//! Reads are served from memory. Catalog writes rewrite the snapshot through
//! a temporary file and a rename; ledger appends write one complete line
//! while holding the ledger mutex, so concurrent appends never interleave.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{read_failed, write_failed, Catalog, EntryFilter, MemoryStorage, Storage};
use crate::error::Result;
use crate::types::{EntryRecord, Event, EventId, Group, GroupId, MasterKey, Terminal, Ticket};

const CATALOG_FILE: &str = "catalog.json";
const LEDGER_FILE: &str = "entries.jsonl";

/// Storage persisted to a data directory.
#[derive(Debug)]
pub struct FileStorage {
    inner: MemoryStorage,
    catalog_path: PathBuf,
    catalog_lock: Mutex<()>,
    ledger: Mutex<File>,
}

impl FileStorage {
    /// Open (or create) the store in `data_dir` and replay the ledger.
    ///
    /// # Errors
    ///
    /// Returns `CannotWrite` if the directory or ledger file cannot be
    /// created, and `CannotRead` if the catalog snapshot is unreadable.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(write_failed)?;

        let catalog_path = data_dir.join(CATALOG_FILE);
        let catalog = if catalog_path.exists() {
            let content = std::fs::read_to_string(&catalog_path).map_err(read_failed)?;
            serde_json::from_str(&content).map_err(read_failed)?
        } else {
            Catalog::default()
        };

        let ledger_path = data_dir.join(LEDGER_FILE);
        let records = replay_ledger(&ledger_path)?;
        let ledger = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&ledger_path)
            .map_err(write_failed)?;

        info!(
            data_dir = %data_dir.display(),
            events = catalog.events.len(),
            tickets = catalog.tickets.len(),
            entries = records.len(),
            "File storage opened"
        );

        Ok(Self {
            inner: MemoryStorage::with_contents(catalog, records),
            catalog_path,
            catalog_lock: Mutex::new(()),
            ledger: Mutex::new(ledger),
        })
    }

    /// Apply a catalog mutation and persist the new snapshot.
    ///
    /// The mutation runs on a staged copy. Readers only see it once the
    /// snapshot is on disk, so a failed write leaves memory unchanged.
    fn persist<T>(&self, mutate: impl FnOnce(&MemoryStorage) -> Result<T>) -> Result<T> {
        let _guard = self.catalog_lock.lock().map_err(write_failed)?;
        let staged = MemoryStorage::with_contents(self.inner.snapshot()?, Vec::new());
        let out = mutate(&staged)?;
        let snapshot = staged.into_catalog()?;
        let content = serde_json::to_string_pretty(&snapshot).map_err(write_failed)?;
        let tmp = self.catalog_path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(write_failed)?;
        std::fs::rename(&tmp, &self.catalog_path).map_err(write_failed)?;
        self.inner.replace_catalog(snapshot)?;
        Ok(out)
    }
}

/// Read every complete record. A torn final line left by a crash is
/// skipped and terminated so the next append starts on a fresh line.
fn replay_ledger(path: &Path) -> Result<Vec<EntryRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(read_failed)?;
    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EntryRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = number + 1, error = %e, "Skipping unreadable ledger line"),
        }
    }
    if !content.is_empty() && !content.ends_with('\n') {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(write_failed)?;
        file.write_all(b"\n").map_err(write_failed)?;
    }
    Ok(records)
}

impl Storage for FileStorage {
    fn events(&self) -> Result<Vec<Event>> {
        self.inner.events()
    }

    fn event(&self, id: EventId) -> Result<Option<Event>> {
        self.inner.event(id)
    }

    fn upsert_event(&self, event: &Event) -> Result<()> {
        self.persist(|s| s.upsert_event(event))
    }

    fn find_ticket(&self, barcode: &str, event_ids: Option<&[EventId]>) -> Result<Option<Ticket>> {
        self.inner.find_ticket(barcode, event_ids)
    }

    fn count_tickets(&self, event_id: EventId) -> Result<u64> {
        self.inner.count_tickets(event_id)
    }

    fn upsert_tickets(&self, tickets: &[Ticket]) -> Result<()> {
        self.persist(|s| s.upsert_tickets(tickets))
    }

    fn remove_stale_tickets(
        &self,
        event_id: EventId,
        source: &str,
        older_than: DateTime<Utc>,
    ) -> Result<usize> {
        self.persist(|s| s.remove_stale_tickets(event_id, source, older_than))
    }

    fn groups(&self) -> Result<Vec<Group>> {
        self.inner.groups()
    }

    fn insert_group(&self, group: &Group) -> Result<()> {
        self.persist(|s| s.insert_group(group))
    }

    fn upsert_group(&self, group: &Group) -> Result<()> {
        self.persist(|s| s.upsert_group(group))
    }

    fn remove_group(&self, id: GroupId) -> Result<bool> {
        self.persist(|s| s.remove_group(id))
    }

    fn terminals(&self) -> Result<Vec<Terminal>> {
        self.inner.terminals()
    }

    fn insert_terminal(&self, terminal: &Terminal) -> Result<()> {
        self.persist(|s| s.insert_terminal(terminal))
    }

    fn update_terminal(&self, terminal: &Terminal) -> Result<bool> {
        self.persist(|s| s.update_terminal(terminal))
    }

    fn master_keys(&self) -> Result<Vec<MasterKey>> {
        self.inner.master_keys()
    }

    fn insert_master_key(&self, key: &MasterKey) -> Result<()> {
        self.persist(|s| s.insert_master_key(key))
    }

    fn entries(&self, filter: &EntryFilter<'_>) -> Result<Vec<EntryRecord>> {
        self.inner.entries(filter)
    }

    fn append_entry(&self, record: &EntryRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).map_err(write_failed)?;
        line.push('\n');

        let mut file = self.ledger.lock().map_err(write_failed)?;
        file.write_all(line.as_bytes()).map_err(write_failed)?;
        file.flush().map_err(write_failed)?;
        self.inner.append_entry(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ResultCode};

    fn record(barcode: &str) -> EntryRecord {
        EntryRecord {
            event_id: 1,
            barcode: barcode.to_string(),
            terminal_id: 1,
            recorded_at: Utc::now(),
            result: ResultCode::Accept,
            direction: Direction::Entry,
        }
    }

    #[test]
    fn test_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStorage::open(dir.path()).unwrap();
            store.append_entry(&record("0001")).unwrap();
            store.append_entry(&record("0002")).unwrap();
        }
        let store = FileStorage::open(dir.path()).unwrap();
        assert_eq!(store.entries(&EntryFilter::barcode("0001")).unwrap().len(), 1);
        assert_eq!(store.entries(&EntryFilter::barcode("0002")).unwrap().len(), 1);
    }

    #[test]
    fn test_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStorage::open(dir.path()).unwrap();
            store
                .insert_master_key(&MasterKey {
                    barcode: "STAFF-1".to_string(),
                    title: None,
                })
                .unwrap();
        }
        let store = FileStorage::open(dir.path()).unwrap();
        assert_eq!(store.master_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_torn_ledger_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStorage::open(dir.path()).unwrap();
            store.append_entry(&record("0001")).unwrap();
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(LEDGER_FILE))
            .unwrap();
        file.write_all(b"{\"event_id\":1,\"barc").unwrap();
        drop(file);

        let store = FileStorage::open(dir.path()).unwrap();
        assert_eq!(store.entries(&EntryFilter::barcode("0001")).unwrap().len(), 1);
        store.append_entry(&record("0002")).unwrap();
        drop(store);

        let store = FileStorage::open(dir.path()).unwrap();
        assert_eq!(store.entries(&EntryFilter::barcode("0002")).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_catalog_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        let key = |barcode: &str| MasterKey {
            barcode: barcode.to_string(),
            title: None,
        };
        store.insert_master_key(&key("STAFF-1")).unwrap();

        // a directory in place of the snapshot makes the rename fail
        std::fs::remove_file(dir.path().join(CATALOG_FILE)).unwrap();
        std::fs::create_dir(dir.path().join(CATALOG_FILE)).unwrap();

        let err = store.insert_master_key(&key("STAFF-2")).unwrap_err();
        assert!(matches!(err, crate::TurnstileError::CannotWrite(_)));
        let keys = store.master_keys().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].barcode, "STAFF-1");
    }

    #[test]
    fn test_corrupt_catalog_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CATALOG_FILE), "not json").unwrap();
        let err = FileStorage::open(dir.path()).unwrap_err();
        assert!(matches!(err, crate::TurnstileError::CannotRead(_)));
    }
}
