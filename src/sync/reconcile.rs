//! Two-directional reconciliation between the local catalog and the payment
//! platform's product catalog.
//!
//! Push mirrors newly publishable products out; pull recovers linkage ids for
//! products that already exist on the platform. Each pass is independently
//! runnable and idempotent: push only targets `linkage_id IS NULL` rows, pull
//! no-ops when the stored linkage already matches. A failed item never aborts
//! its batch - it is logged, counted, and retried naturally on the next run.
//! There is no per-item backoff; retry is an operator-triggered re-run.

use serde::Serialize;

use crate::db::{DbPool, queries};
use crate::error::Result;
use crate::models::CatalogProduct;
use crate::payments::{PaymentCatalog, RemoteProduct};

/// Convert a currency-major-unit amount to the payment platform's minor-unit
/// integer representation.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Default, Serialize)]
pub struct PushSummary {
    /// Unlinked publishable products found at the start of the pass
    pub candidates: usize,
    /// Products created on the payment platform and linked
    pub linked: usize,
    pub prices_created: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct PullSummary {
    pub pages: usize,
    pub examined: usize,
    /// Linkage ids newly persisted onto catalog rows
    pub linked: usize,
    /// Remote products whose linkage was already recorded
    pub already_linked: usize,
    /// Remote products carrying no cross-reference metadata (skipped)
    pub unmatchable: usize,
    pub failed: usize,
    /// Remote products with metadata that matched no catalog row. Reported
    /// for operator review; the local catalog is authoritative for products,
    /// so nothing is created from payment-platform data.
    pub unmatched: Vec<UnmatchedLinkage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedLinkage {
    pub remote_id: String,
    pub handle: Option<String>,
    pub external_id: Option<String>,
}

/// Push pass: create a payment-platform product (and one price per variant
/// with a positive amount) for every unlinked publishable product, oldest
/// first, then persist the returned linkage id.
pub async fn push_products<C: PaymentCatalog>(pool: &DbPool, catalog: &C) -> Result<PushSummary> {
    let products = {
        let conn = pool.get()?;
        queries::list_unlinked_publishable_products(&conn)?
    };

    let mut summary = PushSummary {
        candidates: products.len(),
        ..Default::default()
    };

    for product in &products {
        match push_one(pool, catalog, product).await {
            Ok(prices_created) => {
                summary.linked += 1;
                summary.prices_created += prices_created;
                tracing::info!(
                    external_id = %product.external_id,
                    handle = %product.handle,
                    prices = prices_created,
                    "product pushed to payment platform"
                );
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!(
                    external_id = %product.external_id,
                    handle = %product.handle,
                    "push failed for product, continuing with batch: {}",
                    e
                );
            }
        }
    }

    tracing::info!(
        candidates = summary.candidates,
        linked = summary.linked,
        prices_created = summary.prices_created,
        failed = summary.failed,
        "push reconciliation finished"
    );

    Ok(summary)
}

async fn push_one<C: PaymentCatalog>(
    pool: &DbPool,
    catalog: &C,
    product: &CatalogProduct,
) -> Result<usize> {
    let linkage_id = catalog
        .create_product(&product.title, &product.handle, &product.external_id)
        .await?;

    let variants = {
        let conn = pool.get()?;
        queries::list_variants_for_product(&conn, &product.id)?
    };

    let mut prices_created = 0;
    for variant in &variants {
        // Zero-priced variants carry no checkout-facing price
        if variant.price_amount > 0.0 {
            catalog
                .create_price(
                    &linkage_id,
                    to_minor_units(variant.price_amount),
                    &variant.price_currency,
                )
                .await?;
            prices_created += 1;
        }
    }

    let conn = pool.get()?;
    queries::set_product_linkage(&conn, &product.id, &linkage_id)?;

    Ok(prices_created)
}

enum PullOutcome {
    Linked,
    AlreadyLinked,
    Unmatchable,
    Unmatched,
}

/// Pull pass: page through the payment platform's products and persist their
/// ids onto matching catalog rows, matching by handle first, then external id.
pub async fn pull_linkages<C: PaymentCatalog>(pool: &DbPool, catalog: &C) -> Result<PullSummary> {
    let mut summary = PullSummary::default();
    let mut starting_after: Option<String> = None;

    loop {
        let page = catalog.list_products(starting_after.as_deref()).await?;
        summary.pages += 1;

        {
            let conn = pool.get()?;
            for remote in &page.items {
                summary.examined += 1;
                match link_remote(&conn, remote) {
                    Ok(PullOutcome::Linked) => summary.linked += 1,
                    Ok(PullOutcome::AlreadyLinked) => summary.already_linked += 1,
                    Ok(PullOutcome::Unmatchable) => summary.unmatchable += 1,
                    Ok(PullOutcome::Unmatched) => {
                        tracing::warn!(
                            remote_id = %remote.id,
                            handle = ?remote.handle,
                            external_id = ?remote.external_id,
                            "payment-platform product matches no catalog row"
                        );
                        summary.unmatched.push(UnmatchedLinkage {
                            remote_id: remote.id.clone(),
                            handle: remote.handle.clone(),
                            external_id: remote.external_id.clone(),
                        });
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            remote_id = %remote.id,
                            "pull failed for product, continuing with batch: {}",
                            e
                        );
                    }
                }
            }
        }

        starting_after = page.items.last().map(|p| p.id.clone());
        if !page.has_more || starting_after.is_none() {
            break;
        }
    }

    tracing::info!(
        pages = summary.pages,
        examined = summary.examined,
        linked = summary.linked,
        already_linked = summary.already_linked,
        unmatchable = summary.unmatchable,
        unmatched = summary.unmatched.len(),
        failed = summary.failed,
        "pull reconciliation finished"
    );

    Ok(summary)
}

/// Handles can be renamed upstream, so a previously pushed product may fail
/// to re-match by handle; the external id is the fallback. A product matching
/// neither is reported, never auto-resolved.
fn link_remote(conn: &rusqlite::Connection, remote: &RemoteProduct) -> Result<PullOutcome> {
    if remote.handle.is_none() && remote.external_id.is_none() {
        return Ok(PullOutcome::Unmatchable);
    }

    let mut found = match remote.handle.as_deref() {
        Some(handle) => queries::get_active_product_by_handle(conn, handle)?,
        None => None,
    };
    if found.is_none() {
        if let Some(external_id) = remote.external_id.as_deref() {
            found = queries::get_active_product_by_external_id(conn, external_id)?;
        }
    }

    match found {
        None => Ok(PullOutcome::Unmatched),
        Some(product) if product.linkage_id.as_deref() == Some(remote.id.as_str()) => {
            Ok(PullOutcome::AlreadyLinked)
        }
        Some(product) => {
            queries::set_product_linkage(conn, &product.id, &remote.id)?;
            Ok(PullOutcome::Linked)
        }
    }
}
