use chrono::Utc;
use docstore::{DocumentRepository, Transaction};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::error::{ServiceError, require_non_empty};
use crate::entity::Provider;

#[derive(Serialize)]
struct LastLoginPatch {
    last_login: chrono::DateTime<Utc>,
}

/// Provider accounts. Documents are keyed by subject id.
#[derive(Clone)]
pub struct ProviderStore {
    repo: DocumentRepository<Provider>,
}

impl ProviderStore {
    pub fn new(repo: DocumentRepository<Provider>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &DocumentRepository<Provider> {
        &self.repo
    }

    /// Fresh provider with a new internal id and both timestamps set to now.
    pub fn new_provider(name: &str, email: &str, subject_id: &str) -> Provider {
        let now = Utc::now();
        Provider {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            subject_id: subject_id.to_string(),
            created_at: now,
            last_login: now,
        }
    }

    pub async fn get_by_subject_id(
        &self,
        subject_id: &str,
    ) -> Result<Option<Provider>, ServiceError> {
        Ok(self.repo.get(subject_id).await?)
    }

    /// Persist a new provider at `subject_id`.
    ///
    /// Overwrites an existing provider for the same subject; callers check
    /// [`ProviderStore::get_by_subject_id`] first.
    #[instrument(skip(self, name, email))]
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        subject_id: &str,
    ) -> Result<Provider, ServiceError> {
        require_non_empty(name, "Name")?;
        require_non_empty(subject_id, "Subject id")?;

        let provider = Self::new_provider(name, email, subject_id);
        self.repo.create(&provider).await?;
        info!(provider_id = %provider.id, "Provider created");
        Ok(provider)
    }

    /// Transactional variant of [`ProviderStore::get_by_subject_id`].
    pub async fn get_in(
        &self,
        tx: &Transaction,
        subject_id: &str,
    ) -> Result<Option<Provider>, ServiceError> {
        Ok(self.repo.get_in(tx, subject_id).await?)
    }

    /// Buffer the creation of `provider` in `tx`.
    pub async fn create_in(
        &self,
        tx: &Transaction,
        provider: &Provider,
    ) -> Result<(), ServiceError> {
        self.repo.create_in(tx, provider).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn update_last_login(&self, subject_id: &str) -> Result<Provider, ServiceError> {
        let repo = &self.repo;
        repo.run_transaction(|tx| async move {
            let mut provider = repo
                .get_in(&tx, subject_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Provider not found".into()))?;

            provider.last_login = Utc::now();
            let patch = LastLoginPatch {
                last_login: provider.last_login,
            };
            repo.update_in(&tx, subject_id, &patch).await?;
            Ok::<_, ServiceError>(provider)
        })
        .await
    }
}
