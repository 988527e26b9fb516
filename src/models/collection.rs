use serde::Serialize;

/// A collection mirrored from the upstream platform. Same lifecycle as a
/// product (upsert by `external_id`, soft delete) but with no nested entities.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogCollection {
    pub id: String,
    pub external_id: String,
    pub handle: String,
    pub title: String,
    pub description_html: Option<String>,
    pub sort_order: Option<String>,
    pub source_updated_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

/// Field set written by a collection create/update event.
#[derive(Debug, Clone)]
pub struct UpsertCollection {
    pub external_id: String,
    pub handle: String,
    pub title: String,
    pub description_html: Option<String>,
    pub sort_order: Option<String>,
    pub source_updated_at: Option<i64>,
}
