mod stripe;

pub use stripe::*;

use async_trait::async_trait;

use crate::error::Result;

/// A product in the payment platform's catalog, as seen during pull
/// reconciliation. `handle` and `external_id` are the cross-reference
/// metadata written at push time; either may be absent on products created
/// outside this system.
#[derive(Debug, Clone)]
pub struct RemoteProduct {
    pub id: String,
    pub handle: Option<String>,
    pub external_id: Option<String>,
}

/// One page of the payment platform's product list.
#[derive(Debug, Clone)]
pub struct RemoteProductPage {
    pub items: Vec<RemoteProduct>,
    pub has_more: bool,
}

/// The payment platform's catalog operations, abstracted so the
/// reconciliation engine can run against a fake in tests.
#[async_trait]
pub trait PaymentCatalog: Send + Sync {
    /// Create a product, carrying handle and external id as cross-reference
    /// metadata. Returns the platform's product id (the linkage id).
    async fn create_product(
        &self,
        title: &str,
        handle: &str,
        external_id: &str,
    ) -> Result<String>;

    /// Create a price for a product. `unit_amount` is in currency minor units.
    async fn create_price(
        &self,
        linkage_id: &str,
        unit_amount: i64,
        currency: &str,
    ) -> Result<String>;

    /// List products, cursor-paginated. Pass the last seen product id as
    /// `starting_after` to fetch the next page.
    async fn list_products(&self, starting_after: Option<&str>) -> Result<RemoteProductPage>;
}
