use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

use super::{PaymentCatalog, RemoteProduct, RemoteProductPage};

const API_BASE: &str = "https://api.stripe.com/v1";

/// Per-call timeout for reconciliation traffic. There is no in-client retry:
/// a timed-out item is logged by the caller and picked up on the next pass.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size for product listing.
const LIST_PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct StripeProduct {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeList {
    data: Vec<StripeProduct>,
    has_more: bool,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            secret_key: secret_key.to_string(),
        }
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::PaymentApi(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentApi(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl PaymentCatalog for StripeClient {
    async fn create_product(
        &self,
        title: &str,
        handle: &str,
        external_id: &str,
    ) -> Result<String> {
        let response = self
            .post_form(
                "/products",
                &[
                    ("name", title),
                    ("metadata[handle]", handle),
                    ("metadata[external_id]", external_id),
                ],
            )
            .await?;

        let product: StripeProduct = response
            .json()
            .await
            .map_err(|e| AppError::PaymentApi(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(product.id)
    }

    async fn create_price(
        &self,
        linkage_id: &str,
        unit_amount: i64,
        currency: &str,
    ) -> Result<String> {
        let unit_amount = unit_amount.to_string();
        let currency = currency.to_lowercase();
        let response = self
            .post_form(
                "/prices",
                &[
                    ("product", linkage_id),
                    ("unit_amount", &unit_amount),
                    ("currency", &currency),
                ],
            )
            .await?;

        let price: StripePrice = response
            .json()
            .await
            .map_err(|e| AppError::PaymentApi(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(price.id)
    }

    async fn list_products(&self, starting_after: Option<&str>) -> Result<RemoteProductPage> {
        let mut query: Vec<(&str, &str)> = vec![("limit", LIST_PAGE_SIZE)];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor));
        }

        let response = self
            .client
            .get(format!("{}/products", API_BASE))
            .bearer_auth(&self.secret_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::PaymentApi(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentApi(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let list: StripeList = response
            .json()
            .await
            .map_err(|e| AppError::PaymentApi(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(RemoteProductPage {
            items: list
                .data
                .into_iter()
                .map(|p| RemoteProduct {
                    id: p.id,
                    handle: p.metadata.get("handle").cloned(),
                    external_id: p.metadata.get("external_id").cloned(),
                })
                .collect(),
            has_more: list.has_more,
        })
    }
}
