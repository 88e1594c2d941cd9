//! Anti-passback validation engine.
//!
//! Decides the outcome of one scan `(barcode, terminal, direction)`:
//!
//! 1. Master keys are accepted outright. Nothing is read or written.
//! 2. The ticket is looked up among the terminal's open events. If it is not
//!    there, or the barcode could never be scanned, the result is
//!    `NOT_FOUND` and the ledger is left untouched.
//! 3. The ticket's side of the checkpoint is derived from its latest
//!    accepted record: none or exit means outside, entry means inside.
//! 4. A held lock, or more than the reentry window elapsed since the
//!    ticket's *first* accepted passage, forces `REENTRY`.
//! 5. A direction matching the derived side takes the lock and is accepted.
//! 6. Anything else is `REENTRY`.
//!
//! Every `ACCEPT` and `REENTRY` appends exactly one ledger record. A failed
//! append fails the whole call.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Result, TurnstileError};
use crate::ledger::EntryLedger;
use crate::lock::TicketLocks;
use crate::master_keys::MasterKeys;
use crate::scope::ScopeResolver;
use crate::storage::Storage;
use crate::types::{
    is_valid_barcode, Action, Direction, EntryRecord, Event, ResultCode, Terminal, TerminalId,
    Ticket, TicketState,
};
use crate::window::AccessWindow;

/// Outcome of a scan, as shown to the operator at the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanOutcome {
    /// Decision.
    pub result: ResultCode,

    /// Entry is the permitted direction.
    pub entry: bool,

    /// Exit is the permitted direction.
    pub exit: bool,

    /// The scanned barcode, populated even when no ticket matched.
    #[schema(example = "000000000017")]
    pub barcode: String,

    /// `true` if the barcode was accepted as a master key.
    #[serde(default)]
    pub master_key: bool,

    /// Matched ticket.
    pub ticket: Option<Ticket>,

    /// Event of the matched ticket.
    pub event: Option<Event>,

    /// Last accepted passage before this scan.
    pub last_action: Option<Action>,
}

impl ScanOutcome {
    fn not_found(barcode: &str) -> Self {
        Self {
            result: ResultCode::NotFound,
            entry: false,
            exit: false,
            barcode: barcode.to_string(),
            master_key: false,
            ticket: None,
            event: None,
            last_action: None,
        }
    }
}

/// One ledger record joined with the terminal that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// The ledger record.
    pub record: EntryRecord,

    /// Name of the terminal, if it still exists.
    pub terminal_name: Option<String>,
}

/// Everything known about a barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TicketHistory {
    /// The queried barcode.
    pub barcode: String,

    /// Ticket with this barcode, from any event.
    pub ticket: Option<Ticket>,

    /// Event of that ticket.
    pub event: Option<Event>,

    /// Ledger records, oldest first.
    pub entries: Vec<HistoryEntry>,
}

/// Ticket looked up within a terminal's scope, with its derived state.
struct ScopedTicket {
    ticket: Ticket,
    event: Option<Event>,
    last_accept: Option<EntryRecord>,
    state: TicketState,
}

/// The validation engine. Owns the lock table and shares the master keys.
pub struct Validator {
    storage: Arc<dyn Storage>,
    scope: ScopeResolver,
    ledger: EntryLedger,
    locks: TicketLocks,
    master_keys: Arc<MasterKeys>,
    block_after_reentry: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl Validator {
    /// Create an engine with the window and timings from `config`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        master_keys: Arc<MasterKeys>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            scope: ScopeResolver::new(
                Arc::clone(&storage),
                AccessWindow::from_config(&config.window),
            ),
            ledger: EntryLedger::new(Arc::clone(&storage)),
            locks: TicketLocks::new(config.anti_passback.lock_ttl()),
            block_after_reentry: config.anti_passback.block_after_reentry(),
            storage,
            master_keys,
            clock,
        }
    }

    /// Scope resolver used by this engine.
    #[must_use]
    pub const fn scope(&self) -> &ScopeResolver {
        &self.scope
    }

    /// Current time according to the engine's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Registered terminal by id.
    ///
    /// # Errors
    ///
    /// Returns `TerminalNotFound` for an unknown id.
    pub fn terminal(&self, id: TerminalId) -> Result<Terminal> {
        self.storage
            .terminal(id)?
            .ok_or(TurnstileError::TerminalNotFound(id))
    }

    /// Decide a scan and record the decision.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` or `CannotWrite` if the store fails. Domain
    /// refusals are not errors; they come back as `NOT_FOUND` or `REENTRY`.
    pub fn register(
        &self,
        barcode: &str,
        terminal: &Terminal,
        direction: Direction,
    ) -> Result<ScanOutcome> {
        if self.master_keys.contains(barcode) {
            info!(
                terminal = %terminal.name,
                barcode,
                %direction,
                "Master key accepted"
            );
            return Ok(ScanOutcome {
                result: ResultCode::Accept,
                entry: direction == Direction::Entry,
                exit: direction == Direction::Exit,
                barcode: barcode.to_string(),
                master_key: true,
                ticket: None,
                event: None,
                last_action: None,
            });
        }

        let now = self.clock.now();
        let Some(scoped) = self.lookup(barcode, terminal, now)? else {
            info!(
                terminal = %terminal.name,
                barcode,
                %direction,
                result = %ResultCode::NotFound,
                "Scan"
            );
            return Ok(ScanOutcome::not_found(barcode));
        };

        let result = self.decide(&scoped, direction, now)?;
        self.ledger.append(&EntryRecord {
            event_id: scoped.ticket.event_id,
            barcode: barcode.to_string(),
            terminal_id: terminal.id,
            recorded_at: now,
            result,
            direction,
        })?;

        info!(
            terminal = %terminal.name,
            barcode,
            %direction,
            %result,
            event_id = scoped.ticket.event_id,
            title = %scoped.ticket.title,
            sector = %scoped.ticket.sector,
            price = scoped.ticket.price,
            "Scan"
        );

        let (entry, exit) = if result == ResultCode::Accept {
            scoped.state.allowed()
        } else {
            (false, false)
        };
        Ok(ScanOutcome {
            result,
            entry,
            exit,
            barcode: barcode.to_string(),
            master_key: false,
            last_action: scoped.last_accept.as_ref().map(Action::from),
            ticket: Some(scoped.ticket),
            event: scoped.event,
        })
    }

    /// Look a barcode up as [`register`](Self::register) would, without
    /// recording anything or touching the lock.
    ///
    /// Master keys are not consulted. An in-scope ticket yields `ACCEPT`
    /// with the directions its current side permits.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the store fails.
    pub fn validate(&self, barcode: &str, terminal: &Terminal) -> Result<ScanOutcome> {
        let now = self.clock.now();
        let Some(scoped) = self.lookup(barcode, terminal, now)? else {
            return Ok(ScanOutcome::not_found(barcode));
        };
        let (entry, exit) = scoped.state.allowed();
        Ok(ScanOutcome {
            result: ResultCode::Accept,
            entry,
            exit,
            barcode: barcode.to_string(),
            master_key: false,
            last_action: scoped.last_accept.as_ref().map(Action::from),
            ticket: Some(scoped.ticket),
            event: scoped.event,
        })
    }

    /// Ticket, event and full ledger history of a barcode, across all events.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the store fails.
    pub fn ticket_history(&self, barcode: &str) -> Result<TicketHistory> {
        let ticket = self.storage.find_ticket(barcode, None)?;
        let event = match &ticket {
            Some(ticket) => self.storage.event(ticket.event_id)?,
            None => None,
        };
        let terminals = self.storage.terminals()?;
        let entries = self
            .ledger
            .history(barcode)?
            .into_iter()
            .map(|record| HistoryEntry {
                terminal_name: terminals
                    .iter()
                    .find(|t| t.id == record.terminal_id)
                    .map(|t| t.name.clone()),
                record,
            })
            .collect();
        Ok(TicketHistory {
            barcode: barcode.to_string(),
            ticket,
            event,
            entries,
        })
    }

    fn lookup(
        &self,
        barcode: &str,
        terminal: &Terminal,
        now: DateTime<Utc>,
    ) -> Result<Option<ScopedTicket>> {
        // nothing unscannable is ever stored
        if !is_valid_barcode(barcode) {
            debug!(terminal = %terminal.name, "Unscannable barcode");
            return Ok(None);
        }
        let open = self.scope.open_events(terminal, now)?;
        if open.is_empty() {
            debug!(terminal = %terminal.name, "No open events for terminal");
            return Ok(None);
        }
        let Some(ticket) = self.storage.find_ticket(barcode, Some(&open.ids()))? else {
            return Ok(None);
        };
        let event = open.get(ticket.event_id).cloned();
        let last_accept = self.ledger.most_recent_accept(&ticket)?;
        let state = TicketState::from_last_accept(last_accept.as_ref());
        Ok(Some(ScopedTicket {
            ticket,
            event,
            last_accept,
            state,
        }))
    }

    fn decide(
        &self,
        scoped: &ScopedTicket,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> Result<ResultCode> {
        let barcode = scoped.ticket.barcode.as_str();

        if self.locks.is_locked(barcode, now) {
            debug!(barcode, "Barcode locked by a recent passage");
            return Ok(ResultCode::Reentry);
        }

        if let Some(first) = self.ledger.first_accept(&scoped.ticket)? {
            if now - first.recorded_at > self.block_after_reentry {
                debug!(
                    barcode,
                    first_accept = %first.recorded_at,
                    "Reentry window elapsed"
                );
                return Ok(ResultCode::Reentry);
            }
        }

        if !scoped.state.permits(direction) {
            debug!(barcode, state = ?scoped.state, %direction, "Direction not permitted");
            return Ok(ResultCode::Reentry);
        }

        if !self.locks.try_acquire(barcode, now) {
            debug!(barcode, "Lost lock race to a concurrent scan");
            return Ok(ResultCode::Reentry);
        }

        Ok(ResultCode::Accept)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("scope", &self.scope)
            .field("locks", &self.locks)
            .field("block_after_reentry", &self.block_after_reentry)
            .finish_non_exhaustive()
    }
}
