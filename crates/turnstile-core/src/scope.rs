//! Scope resolver.
//!
//! Maps a terminal to the events it may currently admit to: the terminal's
//! groups select venues (minus excluded halls) and the access window selects
//! the events of those venues that are open right now.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{Result, TurnstileError};
use crate::storage::Storage;
use crate::types::{Event, EventId, Group, GroupId, Terminal};
use crate::window::AccessWindow;

/// Events open for a terminal at one instant, ordered by scheduled time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenEvents {
    events: Vec<Event>,
}

impl OpenEvents {
    /// Event ids, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<EventId> {
        self.events.iter().map(|event| event.id).collect()
    }

    /// Event by id, if it is part of the set.
    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Returns `true` if the terminal is authorized for nothing right now.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of open events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

/// Resolves terminals to their open events.
#[derive(Clone)]
pub struct ScopeResolver {
    storage: Arc<dyn Storage>,
    window: AccessWindow,
}

impl ScopeResolver {
    /// Create a resolver over `storage` using `window`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, window: AccessWindow) -> Self {
        Self { storage, window }
    }

    /// The access window in use.
    #[must_use]
    pub const fn window(&self) -> AccessWindow {
        self.window
    }

    /// Events the terminal may admit to at `now`.
    ///
    /// An event qualifies if it is open and at least one of the terminal's
    /// groups covers its venue and hall. Unknown group ids are ignored; an
    /// empty result is a valid outcome.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if groups or events cannot be queried.
    pub fn open_events(&self, terminal: &Terminal, now: DateTime<Utc>) -> Result<OpenEvents> {
        if terminal.groups.is_empty() {
            return Ok(OpenEvents::default());
        }
        let groups = self.storage.groups_by_ids(&terminal.groups)?;
        if groups.is_empty() {
            return Ok(OpenEvents::default());
        }
        self.open_for_groups(&groups, now)
    }

    /// Every event a single group covers, open or not, ordered by scheduled
    /// time.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for an unknown id and `CannotRead` if the
    /// store cannot be queried.
    pub fn group_events(&self, group_id: GroupId) -> Result<Vec<Event>> {
        let groups = self.storage.groups_by_ids(&[group_id])?;
        let Some(group) = groups.first() else {
            return Err(TurnstileError::GroupNotFound(group_id));
        };
        let mut events: Vec<Event> = self
            .storage
            .events()?
            .into_iter()
            .filter(|event| group.covers(event))
            .collect();
        sort_by_schedule(&mut events);
        Ok(events)
    }

    fn open_for_groups(&self, groups: &[Group], now: DateTime<Utc>) -> Result<OpenEvents> {
        let mut events: Vec<Event> = self
            .storage
            .events()?
            .into_iter()
            .filter(|event| self.window.is_open(event, now))
            .filter(|event| groups.iter().any(|group| group.covers(event)))
            .collect();
        sort_by_schedule(&mut events);
        Ok(OpenEvents { events })
    }
}

fn sort_by_schedule(events: &mut [Event]) {
    events.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
}

impl std::fmt::Debug for ScopeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeResolver")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
