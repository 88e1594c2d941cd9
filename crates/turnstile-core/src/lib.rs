//! # turnstile-core
//!
//! Core business logic for the turnstile venue checkpoint system.
//!
//! This crate provides:
//! - Ticket validation with anti-passback rules (entry, exit, reentry block)
//! - Per-barcode concurrency locking and master-key bypass
//! - Administration of terminals, access groups and master keys
//! - Ingestion of event and ticket batches from the upstream feed
//! - Persistent storage for the catalog and the entry ledger
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`window`] - Event access window evaluation
//! - [`scope`] - Terminal to open-event resolution through access groups
//! - [`ledger`] - Append-only entry ledger queries
//! - [`lock`] - Time-based per-barcode lock
//! - [`master_keys`] - Live master-key set
//! - [`validation`] - The anti-passback engine
//! - [`admin`] - Terminal, group and master-key administration
//! - [`sync`] - Upstream feed ingestion
//! - [`storage`] - Storage trait with in-memory and file backends
//! - [`clock`] - Wall-clock abstraction shared by all time checks
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod master_keys;
pub mod scope;
pub mod storage;
pub mod sync;
pub mod types;
pub mod validation;
pub mod window;

// Re-export primary types for convenience
pub use admin::{Admin, NewGroup, NewTerminal};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    default_config_path, default_data_dir, AntiPassbackConfig, Config, ConfigError, ConfigResult,
    ServerConfig, StorageConfig, WindowConfig, CONFIG_PATH_ENV,
};
pub use error::{Error, Result, TurnstileError};
pub use ledger::EntryLedger;
pub use lock::TicketLocks;
pub use master_keys::MasterKeys;
pub use scope::{OpenEvents, ScopeResolver};
pub use storage::{Catalog, EntryFilter, FileStorage, MemoryStorage, Storage};
pub use sync::{CatalogSync, SyncBatch};
pub use types::{
    is_valid_barcode, Action, Direction, EntryRecord, Event, EventId, Group, GroupId,
    HealthResponse, MasterKey, ResultCode, Terminal, TerminalId, Ticket, TicketState,
};
pub use validation::{HistoryEntry, ScanOutcome, TicketHistory, Validator};
pub use window::AccessWindow;
