use common::{MetricSample, VmStatus};
use docstore::{Cursor, DocumentRepository, Page};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::error::{ServiceError, require_non_empty};
use crate::entity::VirtualMachine;

/// Mutable VM attributes. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VmPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VmStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_hour: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_session_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
}

impl VmPatch {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            require_non_empty(name, "Name")?;
        }
        validate_money(self.cost_per_hour, "cost_per_hour")?;
        validate_money(self.current_session_cost, "current_session_cost")
    }

    fn apply_to(self, vm: &mut VirtualMachine) {
        if let Some(name) = self.name {
            vm.name = name;
        }
        if let Some(client) = self.client {
            vm.client = client;
        }
        if let Some(status) = self.status {
            vm.status = status;
        }
        if let Some(cost) = self.cost_per_hour {
            vm.cost_per_hour = cost;
        }
        if let Some(cost) = self.current_session_cost {
            vm.current_session_cost = cost;
        }
        if let Some(uptime) = self.uptime_secs {
            vm.uptime_secs = uptime;
        }
    }
}

fn validate_money(value: Option<Decimal>, field: &str) -> Result<(), ServiceError> {
    match value {
        Some(v) if v.is_sign_negative() => Err(ServiceError::Validation(format!(
            "{field} must not be negative"
        ))),
        _ => Ok(()),
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("VM {id} not found"))
}

#[derive(Clone)]
pub struct VirtualMachineStore {
    repo: DocumentRepository<VirtualMachine>,
}

impl VirtualMachineStore {
    pub fn new(repo: DocumentRepository<VirtualMachine>) -> Self {
        Self { repo }
    }

    /// Persist `vm`, generating an id when it has none.
    #[instrument(skip_all, fields(vm_id = %vm.vm_id))]
    pub async fn create(&self, mut vm: VirtualMachine) -> Result<VirtualMachine, ServiceError> {
        require_non_empty(&vm.name, "Name")?;
        validate_money(Some(vm.cost_per_hour), "cost_per_hour")?;
        validate_money(Some(vm.current_session_cost), "current_session_cost")?;

        if vm.vm_id.trim().is_empty() {
            vm.vm_id = Uuid::new_v4().to_string();
        }
        self.repo.create(&vm).await?;
        info!(vm_id = %vm.vm_id, "VM created");
        Ok(vm)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<VirtualMachine>, ServiceError> {
        Ok(self.repo.get(id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<VirtualMachine>, ServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get_by_status(
        &self,
        status: VmStatus,
    ) -> Result<Vec<VirtualMachine>, ServiceError> {
        Ok(self.repo.where_equal("status", status.as_str()).await?)
    }

    pub async fn page(
        &self,
        size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<VirtualMachine>, ServiceError> {
        Ok(self.repo.page(size, cursor).await?)
    }

    /// Like [`VirtualMachineStore::page`], restricted to one status.
    pub async fn page_by_status(
        &self,
        status: VmStatus,
        size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<VirtualMachine>, ServiceError> {
        Ok(self
            .repo
            .page_matching(|q| q.where_eq("status", status.as_str()), size, cursor)
            .await?)
    }

    /// Merge `patch` into an existing VM. Hardware spec and metrics are not patchable.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: VmPatch) -> Result<VirtualMachine, ServiceError> {
        patch.validate()?;

        let repo = &self.repo;
        let patch = &patch;
        repo.run_transaction(|tx| async move {
            let mut vm = repo.get_in(&tx, id).await?.ok_or_else(|| not_found(id))?;
            repo.update_in(&tx, id, patch).await?;
            patch.clone().apply_to(&mut vm);
            Ok::<_, ServiceError>(vm)
        })
        .await
    }

    /// Record one utilization sample: overwrite the gauges and slide the history window.
    #[instrument(skip(self))]
    pub async fn update_metrics(
        &self,
        id: &str,
        sample: MetricSample,
    ) -> Result<VirtualMachine, ServiceError> {
        if let Some(channel) = sample.out_of_range_channel() {
            return Err(ServiceError::Validation(format!(
                "{channel} usage must be a percentage between 0 and 100"
            )));
        }

        let repo = &self.repo;
        let vm = repo
            .run_transaction(|tx| async move {
                let mut vm = repo.get_in(&tx, id).await?.ok_or_else(|| not_found(id))?;
                vm.apply_sample(sample);
                repo.set_in(&tx, id, &vm).await?;
                Ok::<_, ServiceError>(vm)
            })
            .await?;

        debug!(samples = vm.history.len(), "Metrics recorded");
        Ok(vm)
    }

    /// Remove a VM. Deleting an unknown id succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.repo.delete(id).await?)
    }
}
