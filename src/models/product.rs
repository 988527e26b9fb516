use serde::Serialize;

/// A product mirrored from the upstream platform.
///
/// `external_id` is the upstream platform's immutable identifier; `linkage_id`
/// is the Stripe product id once reconciliation has paired the two. Soft
/// delete: `deleted_at` set means the product is excluded from all
/// customer-facing reads but kept for audit and idempotent redelivery.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogProduct {
    pub id: String,
    pub external_id: String,
    pub handle: String,
    pub title: String,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: String,
    pub published_at: Option<i64>,
    pub source_updated_at: Option<i64>,
    pub linkage_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl CatalogProduct {
    /// Publishable products are what push reconciliation mirrors to Stripe.
    pub fn is_publishable(&self) -> bool {
        self.deleted_at.is_none() && self.status == "active"
    }
}

/// A variant of a catalog product. Always owned by exactly one product and
/// upserted by `external_id`; removed only when the owning product is.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogVariant {
    pub id: String,
    pub product_id: String,
    pub external_id: String,
    pub title: Option<String>,
    pub sku: Option<String>,
    /// Price in currency major units (e.g. 120.00)
    pub price_amount: f64,
    pub price_currency: String,
    pub compare_at_price_amount: Option<f64>,
    pub position: i64,
    pub inventory_policy: Option<String>,
    pub taxable: bool,
    pub source_updated_at: Option<i64>,
}

/// A product option (e.g. Size, Color). Replaced wholesale on every product
/// update since the upstream payload carries no per-item diff.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogOption {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub position: i64,
    pub values: Vec<String>,
}

/// A media attachment. Replaced wholesale, like options.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogMedia {
    pub id: String,
    pub product_id: String,
    pub src: String,
    pub alt_text: Option<String>,
    pub position: i64,
    pub media_type: Option<String>,
}

/// Field set written by a product create/update event.
#[derive(Debug, Clone)]
pub struct UpsertProduct {
    pub external_id: String,
    pub handle: String,
    pub title: String,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: String,
    pub published_at: Option<i64>,
    pub source_updated_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UpsertVariant {
    pub external_id: String,
    pub title: Option<String>,
    pub sku: Option<String>,
    pub price_amount: f64,
    pub price_currency: String,
    pub compare_at_price_amount: Option<f64>,
    pub position: i64,
    pub inventory_policy: Option<String>,
    pub taxable: bool,
    pub source_updated_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UpsertOption {
    pub name: String,
    pub position: i64,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpsertMedia {
    pub src: String,
    pub alt_text: Option<String>,
    pub position: i64,
    pub media_type: Option<String>,
}

/// Aggregates for the sync status report.
#[derive(Debug, Clone, Copy)]
pub struct SyncStatus {
    pub total_publishable: i64,
    pub linked: i64,
    /// Most recent `updated_at` among linked publishable products
    pub last_linked_update: Option<i64>,
}
