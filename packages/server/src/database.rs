use std::sync::Arc;

use common::RetryPolicy;
use docstore::{
    Binding, DatabaseDocumentStore, DocumentStore, MemoryDocumentStore, RepositoryRegistry,
    StoreError,
};
use tracing::{info, warn};

use crate::config::{StoreBackend, StoreConfig};
use crate::entity::{Payout, Provider, VirtualMachine};

/// Open the configured document store.
pub async fn init_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Database => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| {
                    StoreError::Backend("store.url is required for the database backend".into())
                })?;
            let store = DatabaseDocumentStore::connect(url, config.max_connections).await?;
            info!(max_connections = config.max_connections, "Connected to document database");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory document store; data is lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

/// Bind every entity type to its collection and id rule.
pub fn build_registry(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new(store, retry);
    registry
        .bind(Binding::<Provider>::new().id_rule(|p: &Provider| p.subject_id.clone()))
        .bind(Binding::<VirtualMachine>::new().id_rule(|vm: &VirtualMachine| vm.vm_id.clone()))
        .bind(Binding::<Payout>::new());
    registry
}
