use sea_orm::entity::prelude::*;

/// One stored document, addressed by collection name and document id.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub doc_id: String,

    /// Document payload; always a JSON object.
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

    /// Write stamp compared on transaction commit.
    pub version: i64,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
