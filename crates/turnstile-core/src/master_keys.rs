//! Master key bypass set.
//!
//! Loaded from storage at startup and refreshed on demand. Any barcode in the
//! set is accepted without looking at tickets, the ledger or the lock table.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::error::Result;
use crate::storage::Storage;

/// Live set of master-key barcodes.
#[derive(Debug, Default)]
pub struct MasterKeys {
    keys: RwLock<HashSet<String>>,
}

impl MasterKeys {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the set from storage.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the master keys cannot be queried.
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        let keys = Self::new();
        keys.reload(storage)?;
        Ok(keys)
    }

    /// Replace the set with what storage currently holds.
    ///
    /// On failure the previous set stays in effect.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the master keys cannot be queried.
    pub fn reload(&self, storage: &dyn Storage) -> Result<usize> {
        let fresh: HashSet<String> = storage
            .master_keys()?
            .into_iter()
            .map(|key| key.barcode)
            .collect();
        let count = fresh.len();
        *self.keys.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        info!(count, "Master keys loaded");
        Ok(count)
    }

    /// Add a barcode to the live set.
    pub fn insert(&self, barcode: impl Into<String>) {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(barcode.into());
    }

    /// Returns `true` if `barcode` is a master key.
    #[must_use]
    pub fn contains(&self, barcode: &str) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(barcode)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no keys are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
