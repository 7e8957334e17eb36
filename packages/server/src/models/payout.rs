use chrono::{DateTime, Utc};
use common::PayoutStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::Payout;

/// Request body for recording a payout. Amounts are decimal strings or numbers.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePayoutRequest {
    #[schema(value_type = String, example = "125.40")]
    pub amount: Decimal,
    #[schema(example = "bank_transfer")]
    pub method: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdatePayoutStatusRequest {
    pub status: PayoutStatus,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PayoutResponse {
    #[schema(example = "8Jd02mQpX1aZr7Tk3LwB")]
    pub id: String,
    pub date: DateTime<Utc>,
    #[schema(value_type = String, example = "125.40")]
    pub amount: Decimal,
    pub method: String,
    pub status: PayoutStatus,
}

impl From<Payout> for PayoutResponse {
    fn from(payout: Payout) -> Self {
        Self {
            id: payout.id,
            date: payout.date,
            amount: payout.amount,
            method: payout.method,
            status: payout.status,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PayoutListQuery {
    /// Only payouts in this status.
    pub status: Option<PayoutStatus>,
}
