//! Shared domain types and OpenAPI schemas.
//!
//! Tickets, events, groups and terminals are read by the validation engine
//! but owned by the catalog collaborators. Entry records are the only thing
//! the engine itself creates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Upstream event identifier.
pub type EventId = i64;

/// Terminal identifier, assigned sequentially on creation.
pub type TerminalId = i64;

/// Group identifier, assigned sequentially on creation.
pub type GroupId = i64;

/// Longest barcode a scanner is expected to emit, in bytes.
pub const MAX_BARCODE_LEN: usize = 128;

/// Returns `true` if the barcode can be printed and scanned: non-empty, at
/// most [`MAX_BARCODE_LEN`] bytes, and free of whitespace and control
/// characters.
///
/// Feed tickets and master keys that fail this check are never stored, so
/// a scan that fails it cannot match anything.
#[must_use]
pub fn is_valid_barcode(barcode: &str) -> bool {
    !barcode.is_empty()
        && barcode.len() <= MAX_BARCODE_LEN
        && !barcode
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
}

/// Scan direction requested by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Passing from outside the venue to inside.
    Entry,
    /// Passing from inside the venue to outside.
    Exit,
}

impl Direction {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entry" => Ok(Self::Entry),
            "exit" => Ok(Self::Exit),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Outcome of a single validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    /// The passage is granted.
    Accept,
    /// The passage is refused by anti-passback rules.
    Reentry,
    /// The barcode is not valid for any open event of the terminal.
    NotFound,
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "ACCEPT",
            Self::Reentry => "REENTRY",
            Self::NotFound => "NOT_FOUND",
        })
    }
}

/// A physical admission right, imported from the upstream ticketing feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ticket {
    /// Upstream ticket id, unique together with `event_id`.
    #[schema(example = 17)]
    pub ticket_id: i64,

    /// Event this ticket admits to.
    #[schema(example = 1001)]
    pub event_id: EventId,

    /// Printed barcode, unique within an event.
    #[schema(example = "000000000017")]
    pub barcode: String,

    /// Seating sector.
    #[serde(default)]
    #[schema(example = "Parterre")]
    pub sector: String,

    /// Face price.
    #[serde(default)]
    #[schema(example = 1500.0)]
    pub price: f64,

    /// Display title.
    #[serde(default)]
    #[schema(example = "Swan Lake")]
    pub title: String,

    /// Feed that delivered the ticket.
    #[serde(default)]
    pub source: String,

    /// When the feed last delivered this ticket.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

/// A scheduled occurrence at a venue hall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Upstream event id.
    #[schema(example = 1001)]
    pub id: EventId,

    /// Display title.
    #[serde(default)]
    #[schema(example = "Swan Lake")]
    pub title: String,

    /// Venue display title.
    #[serde(default)]
    pub venue_title: String,

    /// Scheduled start.
    pub scheduled_at: DateTime<Utc>,

    /// Venue (building) identifier.
    #[schema(example = 603)]
    pub venue_id: i64,

    /// Hall identifier within the venue.
    #[serde(default)]
    #[schema(example = 2)]
    pub hall_id: i64,

    /// Number of tickets known for this event.
    #[serde(default)]
    pub tickets_cached: u64,

    /// When the feed last delivered this event.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

/// A named scope binding a building to a set of excluded halls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Group {
    /// Sequential id.
    #[schema(example = 1)]
    pub id: GroupId,

    /// Unique name.
    #[schema(example = "Main building")]
    pub name: String,

    /// Venue (building) covered by this group.
    #[schema(example = 603)]
    pub building_id: i64,

    /// Halls of the building this group never admits to.
    #[serde(default)]
    pub exclude_halls: Vec<i64>,
}

impl Group {
    /// Returns `true` if an event falls under this group's scope.
    #[must_use]
    pub fn covers(&self, event: &Event) -> bool {
        self.building_id == event.venue_id && !self.exclude_halls.contains(&event.hall_id)
    }
}

/// A physical scanning device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Terminal {
    /// Sequential id.
    #[schema(example = 1)]
    pub id: TerminalId,

    /// Unique name.
    #[schema(example = "North gate 1")]
    pub name: String,

    /// Secret key assigned at creation.
    #[serde(default)]
    pub secret: String,

    /// Groups this terminal belongs to.
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

/// A barcode that bypasses all ticket-specific checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MasterKey {
    /// The bypass barcode.
    #[schema(example = "STAFF-0001")]
    pub barcode: String,

    /// Optional note on who holds the key.
    #[serde(default)]
    pub title: Option<String>,
}

/// Immutable record of one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EntryRecord {
    /// Event of the scanned ticket.
    pub event_id: EventId,

    /// Scanned barcode.
    pub barcode: String,

    /// Terminal that performed the scan.
    pub terminal_id: TerminalId,

    /// When the decision was taken.
    pub recorded_at: DateTime<Utc>,

    /// Decision.
    pub result: ResultCode,

    /// Requested direction.
    pub direction: Direction,
}

/// Operator-facing summary of the last accepted passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Action {
    /// Direction of the last accepted passage.
    pub direction: Direction,

    /// Terminal that accepted it.
    pub terminal_id: TerminalId,

    /// When it was accepted.
    pub recorded_at: DateTime<Utc>,
}

impl From<&EntryRecord> for Action {
    fn from(record: &EntryRecord) -> Self {
        Self {
            direction: record.direction,
            terminal_id: record.terminal_id,
            recorded_at: record.recorded_at,
        }
    }
}

/// Which side of the checkpoint a ticket is on, derived from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    /// No accepted passage recorded yet.
    NeverSeen,
    /// Last accepted passage was an exit.
    Outside,
    /// Last accepted passage was an entry.
    Inside,
}

impl TicketState {
    /// Derive the state from the most recent accepted record.
    #[must_use]
    pub fn from_last_accept(last: Option<&EntryRecord>) -> Self {
        match last.map(|record| record.direction) {
            None => Self::NeverSeen,
            Some(Direction::Exit) => Self::Outside,
            Some(Direction::Entry) => Self::Inside,
        }
    }

    /// Returns `(entry_allowed, exit_allowed)`.
    #[must_use]
    pub const fn allowed(self) -> (bool, bool) {
        match self {
            Self::NeverSeen | Self::Outside => (true, false),
            Self::Inside => (false, true),
        }
    }

    /// Returns `true` if the state admits a passage in `direction`.
    #[must_use]
    pub const fn permits(self, direction: Direction) -> bool {
        let (entry, exit) = self.allowed();
        match direction {
            Direction::Entry => entry,
            Direction::Exit => exit,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version.
    #[schema(example = "0.1.0")]
    pub version: String,
}
