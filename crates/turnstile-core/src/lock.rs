//! Per-barcode concurrency lock.
//!
//! After an accepted passage the barcode stays locked for a fixed lifetime,
//! so the same physical ticket presented at two terminals at once cannot be
//! accepted twice. Locks are advisory and time based: nothing releases them,
//! they simply stop counting once `acquired_at + ttl` has passed.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

/// Held entries beyond which expired locks are swept on acquire.
const SWEEP_THRESHOLD: usize = 1024;

/// Map of barcode to lock acquisition time.
#[derive(Debug)]
pub struct TicketLocks {
    ttl: TimeDelta,
    held: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl TicketLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Lock lifetime.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Returns `true` if `barcode` was locked less than `ttl` before `now`.
    #[must_use]
    pub fn is_locked(&self, barcode: &str, now: DateTime<Utc>) -> bool {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.get(barcode)
            .is_some_and(|acquired| self.still_held(*acquired, now))
    }

    /// Lock `barcode` unless someone else holds it.
    ///
    /// The check and the insert happen under one mutex acquisition, so of
    /// two concurrent callers exactly one gets `true`.
    pub fn try_acquire(&self, barcode: &str, now: DateTime<Utc>) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held
            .get(barcode)
            .is_some_and(|acquired| self.still_held(*acquired, now))
        {
            return false;
        }
        if held.len() >= SWEEP_THRESHOLD {
            held.retain(|_, acquired| self.still_held(*acquired, now));
        }
        held.insert(barcode.to_string(), now);
        true
    }

    /// Number of entries in the table, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn still_held(&self, acquired: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < acquired + self.ttl
    }
}
