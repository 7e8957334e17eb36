use common::{MetricHistory, MetricSample, VmStatus};
use docstore::Entity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLIENT: &str = "Unknown";

fn default_client() -> String {
    DEFAULT_CLIENT.to_string()
}

/// Hardware allocated to a VM. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HardwareSpec {
    #[serde(default)]
    pub cpu_cores: u32,
    #[serde(default)]
    pub ram_gb: u32,
}

/// A rented virtual machine, keyed by `vm_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub vm_id: String,
    pub name: String,
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default)]
    pub status: VmStatus,
    #[serde(default)]
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub spec: HardwareSpec,
    #[serde(default)]
    pub cost_per_hour: Decimal,
    #[serde(default)]
    pub current_session_cost: Decimal,
    #[serde(default)]
    pub current_cpu_usage: f64,
    #[serde(default)]
    pub current_gpu_usage: f64,
    #[serde(default)]
    pub current_ram_usage: f64,
    #[serde(flatten)]
    pub history: MetricHistory,
}

impl VirtualMachine {
    pub fn new(vm_id: impl Into<String>, name: impl Into<String>, spec: HardwareSpec) -> Self {
        Self {
            vm_id: vm_id.into(),
            name: name.into(),
            client: default_client(),
            status: VmStatus::default(),
            uptime_secs: 0,
            spec,
            cost_per_hour: Decimal::ZERO,
            current_session_cost: Decimal::ZERO,
            current_cpu_usage: 0.0,
            current_gpu_usage: 0.0,
            current_ram_usage: 0.0,
            history: MetricHistory::default(),
        }
    }

    /// Overwrite the live gauges and append the sample to the history window.
    pub fn apply_sample(&mut self, sample: MetricSample) {
        self.current_cpu_usage = sample.cpu;
        self.current_gpu_usage = sample.gpu;
        self.current_ram_usage = sample.ram;
        self.history.record(sample);
    }
}

impl Entity for VirtualMachine {
    const COLLECTION: &'static str = "virtual_machines";
    const FIELDS: &'static [&'static str] = &[
        "vm_id",
        "name",
        "client",
        "status",
        "uptime_secs",
        "cpu_cores",
        "ram_gb",
        "cost_per_hour",
        "current_session_cost",
        "current_cpu_usage",
        "current_gpu_usage",
        "current_ram_usage",
        "cpu_history",
        "gpu_history",
        "ram_history",
    ];
}
