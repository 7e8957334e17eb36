use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::ParseStatusError;

/// Settlement status of a payout.
///
/// Statuses only move forward: a payout is never reset to an earlier state.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum PayoutStatus {
    /// Requested, not yet picked up.
    #[default]
    Pending,
    /// Handed to the payment rail.
    Processing,
    /// Funds delivered.
    Completed,
    /// Rejected by the payment rail.
    Failed,
}

impl PayoutStatus {
    /// All possible status values.
    pub const ALL: &'static [PayoutStatus] = &[
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    const NAMES: &'static [&'static str] = &["Pending", "Processing", "Completed", "Failed"];

    /// Returns the string representation (PascalCase), which is also the stored form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Returns true if no further transition is possible.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a payout in this status may move to `next`.
    ///
    /// Re-applying the current status is allowed and changes nothing.
    pub fn can_transition_to(&self, next: PayoutStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_final() {
            return false;
        }
        match self {
            Self::Pending => true,
            _ => matches!(next, Self::Completed | Self::Failed),
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            _ => Err(ParseStatusError::new(s, Self::NAMES)),
        }
    }
}
