use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    COLLECTION_COLS, MEDIA_COLS, OPTION_COLS, PRODUCT_COLS, VARIANT_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Products ============

/// Look up a product by upstream id, in any state (including soft-deleted).
/// The upsert engine needs the deleted state to decide between insert, update
/// and revive.
pub fn get_product_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<CatalogProduct>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products WHERE external_id = ?1",
            PRODUCT_COLS
        ),
        &[&external_id],
    )
}

pub fn get_active_product_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<CatalogProduct>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products WHERE external_id = ?1 AND deleted_at IS NULL",
            PRODUCT_COLS
        ),
        &[&external_id],
    )
}

pub fn get_active_product_by_handle(
    conn: &Connection,
    handle: &str,
) -> Result<Option<CatalogProduct>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products WHERE handle = ?1 AND deleted_at IS NULL",
            PRODUCT_COLS
        ),
        &[&handle],
    )
}

pub fn insert_product(conn: &Connection, input: &UpsertProduct) -> Result<CatalogProduct> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO products (id, external_id, handle, title, description_html, vendor, product_type, status, published_at, source_updated_at, linkage_id, created_at, updated_at, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11, ?11, NULL)",
        params![
            &id,
            &input.external_id,
            &input.handle,
            &input.title,
            &input.description_html,
            &input.vendor,
            &input.product_type,
            &input.status,
            input.published_at,
            input.source_updated_at,
            now
        ],
    )?;

    Ok(CatalogProduct {
        id,
        external_id: input.external_id.clone(),
        handle: input.handle.clone(),
        title: input.title.clone(),
        description_html: input.description_html.clone(),
        vendor: input.vendor.clone(),
        product_type: input.product_type.clone(),
        status: input.status.clone(),
        published_at: input.published_at,
        source_updated_at: input.source_updated_at,
        linkage_id: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Overwrite a product's upstream-owned fields. Clears `deleted_at`: an update
/// arriving for a soft-deleted row revives it. `linkage_id` is untouched, it
/// belongs to reconciliation.
pub fn update_product(conn: &Connection, id: &str, input: &UpsertProduct) -> Result<()> {
    conn.execute(
        "UPDATE products SET handle = ?1, title = ?2, description_html = ?3, vendor = ?4, product_type = ?5, status = ?6, published_at = ?7, source_updated_at = ?8, updated_at = ?9, deleted_at = NULL
         WHERE id = ?10",
        params![
            &input.handle,
            &input.title,
            &input.description_html,
            &input.vendor,
            &input.product_type,
            &input.status,
            input.published_at,
            input.source_updated_at,
            now(),
            id
        ],
    )?;
    Ok(())
}

/// Soft-delete a product by upstream id. Returns false when no active row
/// existed - deleting a product the catalog never saw (or already deleted)
/// is not an error.
pub fn soft_delete_product(conn: &Connection, external_id: &str) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE products SET deleted_at = ?1, updated_at = ?1 WHERE external_id = ?2 AND deleted_at IS NULL",
        params![now, external_id],
    )?;
    Ok(affected > 0)
}

/// Record the payment platform's id for a product once reconciliation has
/// paired the two.
pub fn set_product_linkage(conn: &Connection, id: &str, linkage_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE products SET linkage_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![linkage_id, now(), id],
    )?;
    Ok(())
}

/// Products push reconciliation still has to mirror: publishable and never
/// linked, oldest first so re-runs make forward progress in a stable order.
pub fn list_unlinked_publishable_products(conn: &Connection) -> Result<Vec<CatalogProduct>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM products WHERE linkage_id IS NULL AND deleted_at IS NULL AND status = 'active' ORDER BY created_at ASC",
            PRODUCT_COLS
        ),
        &[],
    )
}

// ============ Variants ============

/// Upsert a variant by upstream id. Variants have no delete notification of
/// their own; rows disappear only with their product.
pub fn upsert_variant(conn: &Connection, product_id: &str, input: &UpsertVariant) -> Result<()> {
    conn.execute(
        "INSERT INTO variants (id, product_id, external_id, title, sku, price_amount, price_currency, compare_at_price_amount, position, inventory_policy, taxable, source_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(external_id) DO UPDATE SET
             product_id = excluded.product_id,
             title = excluded.title,
             sku = excluded.sku,
             price_amount = excluded.price_amount,
             price_currency = excluded.price_currency,
             compare_at_price_amount = excluded.compare_at_price_amount,
             position = excluded.position,
             inventory_policy = excluded.inventory_policy,
             taxable = excluded.taxable,
             source_updated_at = excluded.source_updated_at",
        params![
            gen_id(),
            product_id,
            &input.external_id,
            &input.title,
            &input.sku,
            input.price_amount,
            &input.price_currency,
            input.compare_at_price_amount,
            input.position,
            &input.inventory_policy,
            input.taxable as i32,
            input.source_updated_at
        ],
    )?;
    Ok(())
}

pub fn get_variant_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<CatalogVariant>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM variants WHERE external_id = ?1",
            VARIANT_COLS
        ),
        &[&external_id],
    )
}

pub fn list_variants_for_product(
    conn: &Connection,
    product_id: &str,
) -> Result<Vec<CatalogVariant>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM variants WHERE product_id = ?1 ORDER BY position ASC",
            VARIANT_COLS
        ),
        &[&product_id],
    )
}

// ============ Options and media ============

/// Replace a product's option set wholesale. The webhook payload carries the
/// full list with no per-item diff, so the incoming set is authoritative.
pub fn replace_options(
    conn: &Connection,
    product_id: &str,
    options: &[UpsertOption],
) -> Result<()> {
    conn.execute(
        "DELETE FROM product_options WHERE product_id = ?1",
        params![product_id],
    )?;
    for option in options {
        conn.execute(
            "INSERT INTO product_options (id, product_id, name, position, option_values)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                gen_id(),
                product_id,
                &option.name,
                option.position,
                serde_json::to_string(&option.values)?
            ],
        )?;
    }
    Ok(())
}

/// Replace a product's media set wholesale, like options.
pub fn replace_media(conn: &Connection, product_id: &str, media: &[UpsertMedia]) -> Result<()> {
    conn.execute(
        "DELETE FROM product_media WHERE product_id = ?1",
        params![product_id],
    )?;
    for item in media {
        conn.execute(
            "INSERT INTO product_media (id, product_id, src, alt_text, position, media_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                gen_id(),
                product_id,
                &item.src,
                &item.alt_text,
                item.position,
                &item.media_type
            ],
        )?;
    }
    Ok(())
}

pub fn list_options_for_product(
    conn: &Connection,
    product_id: &str,
) -> Result<Vec<CatalogOption>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM product_options WHERE product_id = ?1 ORDER BY position ASC",
            OPTION_COLS
        ),
        &[&product_id],
    )
}

pub fn list_media_for_product(conn: &Connection, product_id: &str) -> Result<Vec<CatalogMedia>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM product_media WHERE product_id = ?1 ORDER BY position ASC",
            MEDIA_COLS
        ),
        &[&product_id],
    )
}

// ============ Collections ============

pub fn get_collection_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<CatalogCollection>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM collections WHERE external_id = ?1",
            COLLECTION_COLS
        ),
        &[&external_id],
    )
}

pub fn insert_collection(conn: &Connection, input: &UpsertCollection) -> Result<CatalogCollection> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO collections (id, external_id, handle, title, description_html, sort_order, source_updated_at, created_at, updated_at, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, NULL)",
        params![
            &id,
            &input.external_id,
            &input.handle,
            &input.title,
            &input.description_html,
            &input.sort_order,
            input.source_updated_at,
            now
        ],
    )?;

    Ok(CatalogCollection {
        id,
        external_id: input.external_id.clone(),
        handle: input.handle.clone(),
        title: input.title.clone(),
        description_html: input.description_html.clone(),
        sort_order: input.sort_order.clone(),
        source_updated_at: input.source_updated_at,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Overwrite a collection's upstream-owned fields, reviving it if soft-deleted.
pub fn update_collection(conn: &Connection, id: &str, input: &UpsertCollection) -> Result<()> {
    conn.execute(
        "UPDATE collections SET handle = ?1, title = ?2, description_html = ?3, sort_order = ?4, source_updated_at = ?5, updated_at = ?6, deleted_at = NULL
         WHERE id = ?7",
        params![
            &input.handle,
            &input.title,
            &input.description_html,
            &input.sort_order,
            input.source_updated_at,
            now(),
            id
        ],
    )?;
    Ok(())
}

/// Soft-delete a collection. Returns false when no active row existed.
pub fn soft_delete_collection(conn: &Connection, external_id: &str) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE collections SET deleted_at = ?1, updated_at = ?1 WHERE external_id = ?2 AND deleted_at IS NULL",
        params![now, external_id],
    )?;
    Ok(affected > 0)
}

// ============ Sync status ============

/// Aggregate how much of the publishable catalog is linked to the payment
/// platform. Pure read.
pub fn sync_status(conn: &Connection) -> Result<SyncStatus> {
    let total_publishable: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND status = 'active'",
        [],
        |row| row.get(0),
    )?;
    let linked: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL AND status = 'active' AND linkage_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    let last_linked_update: Option<i64> = conn
        .query_row(
            "SELECT MAX(updated_at) FROM products WHERE deleted_at IS NULL AND status = 'active' AND linkage_id IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    Ok(SyncStatus {
        total_publishable,
        linked,
        last_linked_update,
    })
}
