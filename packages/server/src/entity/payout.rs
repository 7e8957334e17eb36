use chrono::{DateTime, Utc};
use common::PayoutStatus;
use docstore::Entity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    /// Store-generated document id; not part of the stored payload.
    #[serde(skip)]
    pub id: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub method: String,
    #[serde(default)]
    pub status: PayoutStatus,
}

impl Entity for Payout {
    const COLLECTION: &'static str = "payouts";
    const FIELDS: &'static [&'static str] = &["date", "amount", "method", "status"];

    fn assign_document_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}
