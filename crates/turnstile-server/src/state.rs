//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;
use turnstile_core::{
    AccessWindow, Admin, CatalogSync, Clock, Config, FileStorage, MasterKeys, MemoryStorage,
    Storage, SystemClock, Validator,
};

/// State handed to every handler.
pub type SharedState = Arc<AppState>;

/// Engine components wired to one storage backend.
///
/// The validator, the administrator and the feed synchronizer share the
/// store and the live master-key set. Each component synchronizes
/// internally, so the state itself needs no outer lock.
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Backing store.
    pub storage: Arc<dyn Storage>,
    /// Live master keys.
    pub master_keys: Arc<MasterKeys>,
    /// Anti-passback engine.
    pub validator: Validator,
    /// Terminal, group and master-key administration.
    pub admin: Admin,
    /// Upstream feed ingestion.
    pub sync: CatalogSync,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Open the storage backend named by `config` and wire the engine to the
    /// system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the master keys
    /// cannot be loaded.
    pub fn from_config(config: Config) -> anyhow::Result<SharedState> {
        let storage: Arc<dyn Storage> = if config.storage.memory {
            info!("Using in-memory storage");
            Arc::new(MemoryStorage::new())
        } else {
            Arc::new(FileStorage::open(config.data_dir())?)
        };
        Ok(Self::with_storage(config, storage, Arc::new(SystemClock))?)
    }

    /// Wire the engine to an existing store and clock.
    ///
    /// # Errors
    ///
    /// Returns `CannotRead` if the master keys cannot be loaded.
    pub fn with_storage(
        config: Config,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> turnstile_core::Result<SharedState> {
        let master_keys = Arc::new(MasterKeys::load(storage.as_ref())?);
        let validator = Validator::new(
            Arc::clone(&storage),
            Arc::clone(&master_keys),
            clock,
            &config,
        );
        let admin = Admin::new(Arc::clone(&storage), Arc::clone(&master_keys));
        let sync = CatalogSync::new(
            Arc::clone(&storage),
            AccessWindow::from_config(&config.window),
        );
        Ok(Arc::new(Self {
            config,
            storage,
            master_keys,
            validator,
            admin,
            sync,
            started_at: Instant::now(),
        }))
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
