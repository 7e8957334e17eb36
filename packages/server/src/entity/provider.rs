use chrono::{DateTime, Utc};
use docstore::Entity;
use serde::{Deserialize, Serialize};

/// Provider account, keyed by the identity provider's subject id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    /// Internal id, generated once at registration.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl Entity for Provider {
    const COLLECTION: &'static str = "providers";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "subject_id",
        "created_at",
        "last_login",
    ];
}
