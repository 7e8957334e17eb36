use std::sync::Arc;

use docstore::{RepositoryRegistry, StoreError};

use crate::config::AppConfig;
use crate::identity::IdentityVerifier;
use crate::services::{AccountService, PayoutStore, ProviderStore, VirtualMachineStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub accounts: AccountService,
    pub vms: VirtualMachineStore,
    pub payouts: PayoutStore,
}

impl AppState {
    /// Wire the services from a fully bound registry.
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityVerifier>,
        registry: &RepositoryRegistry,
    ) -> Result<Self, StoreError> {
        let providers = ProviderStore::new(registry.repository()?);
        Ok(Self {
            config: Arc::new(config),
            accounts: AccountService::new(Arc::clone(&identity), providers),
            identity,
            vms: VirtualMachineStore::new(registry.repository()?),
            payouts: PayoutStore::new(registry.repository()?),
        })
    }
}
