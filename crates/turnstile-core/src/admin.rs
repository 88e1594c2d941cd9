//! Administration of terminals, groups and master keys.
//!
//! Ids are assigned sequentially (highest existing id plus one) and names
//! are unique within each kind. Terminal secrets are generated once at
//! creation and survive later updates.
//!
//! Writes go through a single lock shared by every clone of an [`Admin`], so
//! the uniqueness check and the insert that follows it cannot interleave
//! with another request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Result, TurnstileError};
use crate::master_keys::MasterKeys;
use crate::storage::Storage;
use crate::types::{is_valid_barcode, Group, GroupId, MasterKey, Terminal, TerminalId};

/// Fields accepted when creating a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewTerminal {
    /// Unique name.
    #[schema(example = "North gate 1")]
    pub name: String,

    /// Groups the terminal belongs to.
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

/// Fields accepted when creating a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewGroup {
    /// Unique name.
    #[schema(example = "Main building")]
    pub name: String,

    /// Venue (building) the group covers.
    #[schema(example = 603)]
    pub building_id: i64,

    /// Halls excluded from the group.
    #[serde(default)]
    pub exclude_halls: Vec<i64>,
}

/// Catalog administration over a storage backend.
#[derive(Clone)]
pub struct Admin {
    storage: Arc<dyn Storage>,
    master_keys: Arc<MasterKeys>,
    writes: Arc<Mutex<()>>,
}

impl Admin {
    /// Create an administrator sharing the engine's live master-key set.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, master_keys: Arc<MasterKeys>) -> Self {
        Self {
            storage,
            master_keys,
            writes: Arc::new(Mutex::new(())),
        }
    }

    // guards no data, so a poisoned lock is still usable
    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Terminals
    // =========================================================================

    /// All terminals, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the store fails.
    pub fn terminals(&self) -> Result<Vec<Terminal>> {
        let mut terminals = self.storage.terminals()?;
        terminals.sort_by_key(|t| t.id);
        Ok(terminals)
    }

    /// Terminal by id.
    ///
    /// # Errors
    ///
    /// Returns `TerminalNotFound` for an unknown id.
    pub fn terminal(&self, id: TerminalId) -> Result<Terminal> {
        self.storage
            .terminal(id)?
            .ok_or(TurnstileError::TerminalNotFound(id))
    }

    /// Register a terminal and generate its secret.
    ///
    /// # Errors
    ///
    /// Returns `TerminalExists` if the name is taken.
    pub fn add_terminal(&self, new: NewTerminal) -> Result<Terminal> {
        let _writes = self.write_lock();
        let existing = self.storage.terminals()?;
        if existing.iter().any(|t| t.name == new.name) {
            return Err(TurnstileError::TerminalExists(new.name));
        }
        let terminal = Terminal {
            id: next_id(existing.iter().map(|t| t.id)),
            name: new.name,
            secret: Uuid::new_v4().simple().to_string(),
            groups: new.groups,
        };
        self.storage.insert_terminal(&terminal)?;
        info!(id = terminal.id, name = %terminal.name, "Terminal added");
        Ok(terminal)
    }

    /// Replace a terminal's name and groups. The secret is kept.
    ///
    /// # Errors
    ///
    /// Returns `TerminalNotFound` for an unknown id and `TerminalExists` if
    /// the new name belongs to another terminal.
    pub fn update_terminal(&self, id: TerminalId, update: NewTerminal) -> Result<Terminal> {
        let _writes = self.write_lock();
        let existing = self.storage.terminals()?;
        let current = existing
            .iter()
            .find(|t| t.id == id)
            .ok_or(TurnstileError::TerminalNotFound(id))?;
        if existing.iter().any(|t| t.id != id && t.name == update.name) {
            return Err(TurnstileError::TerminalExists(update.name));
        }
        let terminal = Terminal {
            id,
            name: update.name,
            secret: current.secret.clone(),
            groups: update.groups,
        };
        if !self.storage.update_terminal(&terminal)? {
            return Err(TurnstileError::TerminalNotFound(id));
        }
        info!(id, name = %terminal.name, "Terminal updated");
        Ok(terminal)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// All groups, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the store fails.
    pub fn groups(&self) -> Result<Vec<Group>> {
        let mut groups = self.storage.groups()?;
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    /// Create a group.
    ///
    /// # Errors
    ///
    /// Returns `GroupExists` if the name is taken.
    pub fn add_group(&self, new: NewGroup) -> Result<Group> {
        let _writes = self.write_lock();
        let existing = self.storage.groups()?;
        if existing.iter().any(|g| g.name == new.name) {
            return Err(TurnstileError::GroupExists(new.name));
        }
        let group = Group {
            id: next_id(existing.iter().map(|g| g.id)),
            name: new.name,
            building_id: new.building_id,
            exclude_halls: new.exclude_halls,
        };
        self.storage.insert_group(&group)?;
        info!(id = group.id, name = %group.name, "Group added");
        Ok(group)
    }

    /// Create or replace a group keyed by name.
    ///
    /// A new name gets the next free id; an existing name keeps its id.
    ///
    /// # Errors
    ///
    /// Returns `CannotWrite` if the store fails.
    pub fn set_group(&self, group: NewGroup) -> Result<Group> {
        let _writes = self.write_lock();
        let existing = self.storage.groups()?;
        let id = existing
            .iter()
            .find(|g| g.name == group.name)
            .map_or_else(|| next_id(existing.iter().map(|g| g.id)), |g| g.id);
        let group = Group {
            id,
            name: group.name,
            building_id: group.building_id,
            exclude_halls: group.exclude_halls,
        };
        self.storage.upsert_group(&group)?;
        info!(id, name = %group.name, "Group set");
        Ok(group)
    }

    /// Delete a group.
    ///
    /// Terminals keep the stale id; the scope resolver ignores it.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for an unknown id.
    pub fn remove_group(&self, id: GroupId) -> Result<()> {
        let _writes = self.write_lock();
        if !self.storage.remove_group(id)? {
            return Err(TurnstileError::GroupNotFound(id));
        }
        info!(id, "Group removed");
        Ok(())
    }

    // =========================================================================
    // Master keys
    // =========================================================================

    /// Persist a master key and make it live immediately.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBarcode` for a barcode no scanner could produce and `MasterKeyExists`
    /// if it is already registered.
    pub fn add_master_key(&self, key: MasterKey) -> Result<MasterKey> {
        if !is_valid_barcode(&key.barcode) {
            return Err(TurnstileError::InvalidBarcode(key.barcode));
        }
        let _writes = self.write_lock();
        if self
            .storage
            .master_keys()?
            .iter()
            .any(|k| k.barcode == key.barcode)
        {
            return Err(TurnstileError::MasterKeyExists(key.barcode));
        }
        self.storage.insert_master_key(&key)?;
        self.master_keys.insert(key.barcode.clone());
        info!(barcode = %key.barcode, "Master key added");
        Ok(key)
    }

    /// Replace the live master-key set from storage.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the store fails; the previous set stays live.
    pub fn reload_master_keys(&self) -> Result<usize> {
        self.master_keys.reload(self.storage.as_ref())
    }
}

impl std::fmt::Debug for Admin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admin").finish_non_exhaustive()
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().map_or(1, |max| max + 1)
}
