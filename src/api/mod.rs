//! API module - HTTP handlers and middleware.

pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::config::Config;
use crate::services::note_service::NoteService;
use crate::services::payment_service::PaymentService;
use crate::storage::filesystem::FilesystemStorage;
use crate::storage::StorageBackend;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub storage: Arc<dyn StorageBackend>,
}

impl AppState {
    pub fn new(config: Config, db: PgPool) -> Self {
        let storage: Arc<dyn StorageBackend> =
            Arc::new(FilesystemStorage::new(config.storage_path.clone()));
        Self {
            config,
            db,
            storage,
        }
    }

    /// Create a NoteService bound to the shared pool and storage.
    pub fn create_note_service(&self) -> NoteService {
        NoteService::new(self.db.clone(), self.storage.clone())
    }

    /// Create a PaymentService bound to the shared pool.
    pub fn create_payment_service(&self) -> PaymentService {
        PaymentService::new(self.db.clone(), Arc::new(self.config.clone()))
    }
}

pub type SharedState = Arc<AppState>;
