//! Application state
//!
//! Handlers and background tasks share `Arc<AppState>`: configuration, the
//! storage backend, the repository traits, and the upload service that
//! orchestrates conversion.

use std::sync::Arc;

use leadmag_core::Config;
use leadmag_db::{DocumentStore, LeadStore};
use leadmag_storage::Storage;

use crate::services::upload::UploadService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub documents: Arc<dyn DocumentStore>,
    pub leads: Arc<dyn LeadStore>,
    pub uploads: Arc<UploadService>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        documents: Arc<dyn DocumentStore>,
        leads: Arc<dyn LeadStore>,
    ) -> Self {
        let uploads = Arc::new(UploadService::new(
            &config,
            storage.clone(),
            documents.clone(),
        ));
        AppState {
            config,
            storage,
            documents,
            leads,
            uploads,
        }
    }

    /// In-memory state for handler and service tests.
    #[cfg(test)]
    pub fn for_tests() -> Arc<Self> {
        use leadmag_db::{InMemoryDocumentStore, InMemoryLeadStore};
        use leadmag_storage::MemoryStorage;

        Arc::new(AppState::new(
            Config::for_tests(),
            Arc::new(MemoryStorage::new()),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryLeadStore::new()),
        ))
    }
}
