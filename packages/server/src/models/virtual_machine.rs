use common::{MetricSample, VmStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::virtual_machine::DEFAULT_CLIENT;
use crate::entity::{HardwareSpec, VirtualMachine};
use crate::error::AppError;
use crate::services::VmPatch;

/// Page size used when a cursor is given without a limit.
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;

/// Request body for registering a VM.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateVmRequest {
    /// Caller-chosen id. Generated when omitted.
    #[schema(example = "vm-frankfurt-07")]
    #[serde(default)]
    pub vm_id: Option<String>,
    #[schema(example = "gpu-worker-7")]
    pub name: String,
    /// Renting client. Defaults to `Unknown`.
    #[schema(example = "Acme Research")]
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub status: Option<VmStatus>,
    #[schema(example = 16)]
    pub cpu_cores: u32,
    #[schema(example = 64)]
    pub ram_gb: u32,
    #[schema(value_type = Option<String>, example = "1.25")]
    #[serde(default)]
    pub cost_per_hour: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "0")]
    #[serde(default)]
    pub current_session_cost: Option<Decimal>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
}

pub fn validate_create_vm(payload: &CreateVmRequest) -> Result<(), AppError> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > 128 {
        return Err(AppError::Validation("Name must be 1-128 characters".into()));
    }
    if let Some(id) = &payload.vm_id {
        if id.contains('/') {
            return Err(AppError::Validation("VM id must not contain '/'".into()));
        }
    }
    Ok(())
}

impl From<CreateVmRequest> for VirtualMachine {
    fn from(payload: CreateVmRequest) -> Self {
        let spec = HardwareSpec {
            cpu_cores: payload.cpu_cores,
            ram_gb: payload.ram_gb,
        };
        let mut vm = VirtualMachine::new(
            payload.vm_id.unwrap_or_default().trim(),
            payload.name.trim(),
            spec,
        );
        vm.client = payload
            .client
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT.to_string());
        vm.status = payload.status.unwrap_or_default();
        vm.cost_per_hour = payload.cost_per_hour.unwrap_or_default();
        vm.current_session_cost = payload.current_session_cost.unwrap_or_default();
        vm.uptime_secs = payload.uptime_secs.unwrap_or_default();
        vm
    }
}

/// Partial VM update. Omitted fields are left unchanged.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateVmRequest {
    pub name: Option<String>,
    pub client: Option<String>,
    pub status: Option<VmStatus>,
    #[schema(value_type = Option<String>, example = "1.50")]
    pub cost_per_hour: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "3.75")]
    pub current_session_cost: Option<Decimal>,
    pub uptime_secs: Option<u64>,
}

impl UpdateVmRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.client.is_none()
            && self.status.is_none()
            && self.cost_per_hour.is_none()
            && self.current_session_cost.is_none()
            && self.uptime_secs.is_none()
    }
}

impl From<UpdateVmRequest> for VmPatch {
    fn from(payload: UpdateVmRequest) -> Self {
        VmPatch {
            name: payload.name.map(|n| n.trim().to_string()),
            client: payload.client.map(|c| c.trim().to_string()),
            status: payload.status,
            cost_per_hour: payload.cost_per_hour,
            current_session_cost: payload.current_session_cost,
            uptime_secs: payload.uptime_secs,
        }
    }
}

/// One utilization sample, each channel a percentage in 0-100.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct MetricsRequest {
    #[schema(example = 42.5)]
    pub cpu: f64,
    #[schema(example = 87.0)]
    pub gpu: f64,
    #[schema(example = 61.2)]
    pub ram: f64,
}

impl From<MetricsRequest> for MetricSample {
    fn from(payload: MetricsRequest) -> Self {
        MetricSample::new(payload.cpu, payload.gpu, payload.ram)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VmResponse {
    #[schema(example = "vm-frankfurt-07")]
    pub vm_id: String,
    pub name: String,
    pub client: String,
    pub status: VmStatus,
    pub uptime_secs: u64,
    pub cpu_cores: u32,
    pub ram_gb: u32,
    #[schema(value_type = String, example = "1.25")]
    pub cost_per_hour: Decimal,
    #[schema(value_type = String, example = "3.75")]
    pub current_session_cost: Decimal,
    pub current_cpu_usage: f64,
    pub current_gpu_usage: f64,
    pub current_ram_usage: f64,
    /// Most recent CPU samples, oldest first. At most 20 entries.
    pub cpu_history: Vec<f64>,
    pub gpu_history: Vec<f64>,
    pub ram_history: Vec<f64>,
}

impl From<VirtualMachine> for VmResponse {
    fn from(vm: VirtualMachine) -> Self {
        Self {
            vm_id: vm.vm_id,
            name: vm.name,
            client: vm.client,
            status: vm.status,
            uptime_secs: vm.uptime_secs,
            cpu_cores: vm.spec.cpu_cores,
            ram_gb: vm.spec.ram_gb,
            cost_per_hour: vm.cost_per_hour,
            current_session_cost: vm.current_session_cost,
            current_cpu_usage: vm.current_cpu_usage,
            current_gpu_usage: vm.current_gpu_usage,
            current_ram_usage: vm.current_ram_usage,
            cpu_history: vm.history.cpu,
            gpu_history: vm.history.gpu,
            ram_history: vm.history.ram,
        }
    }
}

/// Listing filters. Supplying `limit` or `cursor` switches to paginated mode.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VmListQuery {
    /// Only VMs in this status.
    pub status: Option<VmStatus>,
    /// Page size (1-100).
    pub limit: Option<usize>,
    /// `next_cursor` from the previous page.
    pub cursor: Option<String>,
}

impl VmListQuery {
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.cursor.is_some()
    }

    pub fn page_size(&self) -> Result<usize, AppError> {
        match self.limit {
            None => Ok(DEFAULT_PAGE_SIZE),
            Some(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
            Some(_) => Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            ))),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VmListResponse {
    pub items: Vec<VmResponse>,
    /// Cursor for the next page. Absent on the last page and in unpaginated mode.
    pub next_cursor: Option<String>,
}
