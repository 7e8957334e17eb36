use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use common::RetryPolicy;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::repository::{DocumentRepository, Entity, IdRule};
use crate::store::DocumentStore;

/// How one entity type is bound: collection override and id rule.
pub struct Binding<T: Entity> {
    collection: Option<String>,
    id_rule: Option<IdRule<T>>,
}

impl<T: Entity> Default for Binding<T> {
    fn default() -> Self {
        Self {
            collection: None,
            id_rule: None,
        }
    }
}

impl<T: Entity> Binding<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn id_rule(mut self, rule: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.id_rule = Some(Arc::new(rule));
        self
    }
}

/// Startup wiring from entity type to its repository.
///
/// Built once over the shared store; lookups hand out cheap clones.
pub struct RepositoryRegistry {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    repositories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    collections: HashMap<String, &'static str>,
}

impl RepositoryRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            repositories: HashMap::new(),
            collections: HashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Bind `T` to a repository. Binding the same type again replaces it.
    pub fn bind<T: Entity>(&mut self, binding: Binding<T>) -> &mut Self {
        let collection = binding.collection.unwrap_or_else(|| T::COLLECTION.to_string());

        let mut repository = DocumentRepository::<T>::new(Arc::clone(&self.store))
            .with_collection(collection.as_str())
            .with_retry_policy(self.retry);
        if let Some(rule) = binding.id_rule {
            repository = repository.with_id_rule(rule);
        }

        if let Some(other) = self.collections.insert(collection.clone(), type_name::<T>())
            && other != type_name::<T>()
        {
            warn!(
                collection = %collection,
                previous = other,
                entity = type_name::<T>(),
                "Collection bound to two entity types"
            );
        }
        info!(collection = %collection, entity = type_name::<T>(), "Bound repository");

        self.repositories.insert(TypeId::of::<T>(), Box::new(repository));
        self
    }

    pub fn repository<T: Entity>(&self) -> Result<DocumentRepository<T>, StoreError> {
        self.repositories
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<DocumentRepository<T>>())
            .cloned()
            .ok_or(StoreError::Unregistered(type_name::<T>()))
    }
}
