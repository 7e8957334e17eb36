use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::ParseStatusError;

/// Lifecycle status of a rented virtual machine.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum VmStatus {
    /// Powered off; accrues no session cost.
    #[default]
    Stopped,
    /// Boot requested, not yet reporting metrics.
    Starting,
    /// Up and reporting utilization.
    Running,
    /// Shutdown requested.
    Stopping,
    /// The hypervisor reported a fault.
    Error,
}

impl VmStatus {
    /// All possible status values.
    pub const ALL: &'static [VmStatus] = &[
        Self::Stopped,
        Self::Starting,
        Self::Running,
        Self::Stopping,
        Self::Error,
    ];

    const NAMES: &'static [&'static str] = &["Stopped", "Starting", "Running", "Stopping", "Error"];

    /// Returns the string representation (PascalCase), which is also the stored form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VmStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Stopped" => Ok(Self::Stopped),
            "Starting" => Ok(Self::Starting),
            "Running" => Ok(Self::Running),
            "Stopping" => Ok(Self::Stopping),
            "Error" => Ok(Self::Error),
            _ => Err(ParseStatusError::new(s, Self::NAMES)),
        }
    }
}
