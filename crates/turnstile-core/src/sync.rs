//! Ingestion of event and ticket batches from the upstream ticketing feed.
//!
//! The feed client itself lives outside this crate; it hands over one
//! [`SyncBatch`] per event. Tickets are keyed by `(ticket_id, event_id)` and
//! tickets the feed stopped delivering are removed once the new batch is in.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{is_valid_barcode, Event, Ticket};
use crate::window::AccessWindow;

/// One event and its full ticket list from a single feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncBatch {
    /// The event. `tickets_cached` and `last_update` are recomputed.
    pub event: Event,

    /// Every ticket currently sold for the event.
    #[serde(default)]
    pub tickets: Vec<Ticket>,

    /// Feed identifier stamped on each ticket.
    #[schema(example = "box-office")]
    pub source: String,
}

/// Applies feed batches to storage.
#[derive(Clone)]
pub struct CatalogSync {
    storage: Arc<dyn Storage>,
    window: AccessWindow,
}

impl CatalogSync {
    /// Create a synchronizer.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, window: AccessWindow) -> Self {
        Self { storage, window }
    }

    /// Store a batch received at `now`.
    ///
    /// Stale tickets of the same event and source are removed only after the
    /// ticket upsert succeeded. Tickets whose barcode could never be scanned
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `CannotWrite` if the event or tickets cannot be stored.
    pub fn apply(&self, batch: SyncBatch, now: DateTime<Utc>) -> Result<Event> {
        let SyncBatch {
            mut event,
            tickets,
            source,
        } = batch;

        event.last_update = Some(now);
        self.storage.upsert_event(&event)?;

        let tickets: Vec<Ticket> = tickets
            .into_iter()
            .filter(|ticket| {
                let scannable = is_valid_barcode(&ticket.barcode);
                if !scannable {
                    warn!(
                        event_id = event.id,
                        ticket_id = ticket.ticket_id,
                        barcode = %ticket.barcode,
                        "Skipping unscannable ticket"
                    );
                }
                scannable
            })
            .map(|ticket| Ticket {
                event_id: event.id,
                source: source.clone(),
                last_update: Some(now),
                ..ticket
            })
            .collect();
        self.storage.upsert_tickets(&tickets)?;

        let removed = self.storage.remove_stale_tickets(event.id, &source, now)?;
        if removed > 0 {
            warn!(event_id = event.id, %source, removed, "Removed tickets dropped by feed");
        }

        event.tickets_cached = self.storage.count_tickets(event.id)?;
        self.storage.upsert_event(&event)?;
        info!(
            event_id = event.id,
            %source,
            tickets = event.tickets_cached,
            "Event synchronized"
        );
        Ok(event)
    }

    /// Events scheduled inside the access window widened by `delta` on both
    /// sides, ordered by scheduled time. These are due for re-sync.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the store fails.
    pub fn maintenance_window(&self, now: DateTime<Utc>, delta: TimeDelta) -> Result<Vec<Event>> {
        let window = self.window.widened(delta);
        let mut events: Vec<Event> = self
            .storage
            .events()?
            .into_iter()
            .filter(|event| window.is_open(event, now))
            .collect();
        events.sort_by_key(|event| event.scheduled_at);
        Ok(events)
    }
}

impl std::fmt::Debug for CatalogSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSync")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
