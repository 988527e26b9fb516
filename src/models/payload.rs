//! Upstream webhook payload shapes.
//!
//! These mirror the entity JSON the upstream platform posts to the webhook
//! endpoints. Fields the catalog does not track are simply not declared;
//! serde ignores them.

use serde::{Deserialize, Deserializer};

use super::{UpsertCollection, UpsertMedia, UpsertOption, UpsertProduct, UpsertVariant};

/// Currency applied when the payload omits one (single-currency shops).
pub const DEFAULT_CURRENCY: &str = "USD";

/// Monetary amounts arrive as strings ("120.00") from the upstream platform,
/// but as numbers from older API versions. Accept both.
fn de_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Num(f64),
        Text(String),
    }

    Ok(match Option::<Amount>::deserialize(deserializer)? {
        None => None,
        Some(Amount::Num(n)) => Some(n),
        Some(Amount::Text(s)) => s.trim().parse().ok(),
    })
}

fn parse_ts(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.timestamp())
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub id: i64,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantPayload>,
    #[serde(default)]
    pub options: Vec<OptionPayload>,
    #[serde(default, alias = "images")]
    pub media: Vec<MediaPayload>,
}

impl ProductPayload {
    pub fn to_upsert(&self) -> UpsertProduct {
        UpsertProduct {
            external_id: self.id.to_string(),
            handle: self.handle.clone(),
            title: self.title.clone(),
            description_html: self.body_html.clone(),
            vendor: self.vendor.clone(),
            product_type: self.product_type.clone(),
            status: self.status.clone(),
            published_at: parse_ts(self.published_at.as_deref()),
            source_updated_at: parse_ts(self.updated_at.as_deref()),
        }
    }

    pub fn variant_upserts(&self) -> Vec<UpsertVariant> {
        self.variants
            .iter()
            .enumerate()
            .map(|(idx, v)| v.to_upsert(idx))
            .collect()
    }

    pub fn option_upserts(&self) -> Vec<UpsertOption> {
        self.options
            .iter()
            .enumerate()
            .map(|(idx, o)| UpsertOption {
                name: o.name.clone(),
                position: o.position.unwrap_or(idx as i64 + 1),
                values: o.values.clone(),
            })
            .collect()
    }

    /// Media entries without a source URL carry nothing the storefront can
    /// render and are dropped.
    pub fn media_upserts(&self) -> Vec<UpsertMedia> {
        self.media
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| {
                m.src.as_ref().map(|src| UpsertMedia {
                    src: src.clone(),
                    alt_text: m.alt_text.clone(),
                    position: m.position.unwrap_or(idx as i64 + 1),
                    media_type: m.media_type.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct VariantPayload {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de_amount")]
    pub compare_at_price: Option<f64>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub inventory_policy: Option<String>,
    #[serde(default)]
    pub taxable: Option<bool>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl VariantPayload {
    fn to_upsert(&self, idx: usize) -> UpsertVariant {
        UpsertVariant {
            external_id: self.id.to_string(),
            title: self.title.clone(),
            sku: self.sku.clone(),
            price_amount: self.price.unwrap_or(0.0),
            price_currency: self
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            compare_at_price_amount: self.compare_at_price,
            position: self.position.unwrap_or(idx as i64 + 1),
            inventory_policy: self.inventory_policy.clone(),
            taxable: self.taxable.unwrap_or(true),
            source_updated_at: parse_ts(self.updated_at.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OptionPayload {
    pub name: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    #[serde(default, alias = "url")]
    pub src: Option<String>,
    #[serde(default, alias = "alt")]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default, alias = "media_content_type")]
    pub media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionPayload {
    pub id: i64,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl CollectionPayload {
    pub fn to_upsert(&self) -> UpsertCollection {
        UpsertCollection {
            external_id: self.id.to_string(),
            handle: self.handle.clone(),
            title: self.title.clone(),
            description_html: self.body_html.clone(),
            sort_order: self.sort_order.clone(),
            source_updated_at: parse_ts(self.updated_at.as_deref()),
        }
    }
}

/// Delete notifications carry only the entity id.
#[derive(Debug, Deserialize)]
pub struct DeletePayload {
    pub id: i64,
}
