use std::sync::Arc;

use tracing::{info, instrument};

use super::error::{ServiceError, require_non_empty};
use super::provider::ProviderStore;
use crate::entity::Provider;
use crate::identity::{IdentityVerifier, VerifiedIdentity};

/// Registration and login on top of the identity provider.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityVerifier>,
    providers: ProviderStore,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityVerifier>, providers: ProviderStore) -> Self {
        Self { identity, providers }
    }

    pub async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, ServiceError> {
        Ok(self.identity.verify(credential).await?)
    }

    /// Create the provider for the credential's subject.
    ///
    /// The existence check and the write commit together, so two concurrent
    /// registrations for one subject yield one provider and one `Conflict`.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        name: &str,
        credential: &str,
        email: Option<&str>,
    ) -> Result<Provider, ServiceError> {
        require_non_empty(name, "Name")?;
        let identity = self.verify(credential).await?;

        let email = email
            .map(str::to_owned)
            .or(identity.email)
            .unwrap_or_default();
        let provider = ProviderStore::new_provider(name, &email, &identity.subject_id);

        let providers = &self.providers;
        let provider = providers
            .repository()
            .run_transaction(|tx| {
                let provider = provider.clone();
                async move {
                    if providers.get_in(&tx, &provider.subject_id).await?.is_some() {
                        return Err(ServiceError::Conflict(
                            "A provider with this account already exists".into(),
                        ));
                    }
                    providers.create_in(&tx, &provider).await?;
                    Ok(provider)
                }
            })
            .await?;

        info!(subject_id = %provider.subject_id, provider_id = %provider.id, "Provider registered");
        Ok(provider)
    }

    /// Resolve the credential's provider and refresh its last-login time.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, credential: &str) -> Result<Provider, ServiceError> {
        let identity = self.verify(credential).await?;
        self.providers
            .update_last_login(&identity.subject_id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => {
                    ServiceError::NotFound("Provider not found. Please register first".into())
                }
                other => other,
            })
    }

    pub async fn current(&self, subject_id: &str) -> Result<Provider, ServiceError> {
        self.providers
            .get_by_subject_id(subject_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Provider not found".into()))
    }
}
