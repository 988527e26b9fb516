//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const PRODUCT_COLS: &str = "id, external_id, handle, title, description_html, vendor, product_type, status, published_at, source_updated_at, linkage_id, created_at, updated_at, deleted_at";

pub const VARIANT_COLS: &str = "id, product_id, external_id, title, sku, price_amount, price_currency, compare_at_price_amount, position, inventory_policy, taxable, source_updated_at";

pub const OPTION_COLS: &str = "id, product_id, name, position, option_values";

pub const MEDIA_COLS: &str = "id, product_id, src, alt_text, position, media_type";

pub const COLLECTION_COLS: &str = "id, external_id, handle, title, description_html, sort_order, source_updated_at, created_at, updated_at, deleted_at";

// ============ FromRow Implementations ============

impl FromRow for CatalogProduct {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CatalogProduct {
            id: row.get(0)?,
            external_id: row.get(1)?,
            handle: row.get(2)?,
            title: row.get(3)?,
            description_html: row.get(4)?,
            vendor: row.get(5)?,
            product_type: row.get(6)?,
            status: row.get(7)?,
            published_at: row.get(8)?,
            source_updated_at: row.get(9)?,
            linkage_id: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            deleted_at: row.get(13)?,
        })
    }
}

impl FromRow for CatalogVariant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CatalogVariant {
            id: row.get(0)?,
            product_id: row.get(1)?,
            external_id: row.get(2)?,
            title: row.get(3)?,
            sku: row.get(4)?,
            price_amount: row.get(5)?,
            price_currency: row.get(6)?,
            compare_at_price_amount: row.get(7)?,
            position: row.get(8)?,
            inventory_policy: row.get(9)?,
            taxable: row.get::<_, i32>(10)? != 0,
            source_updated_at: row.get(11)?,
        })
    }
}

impl FromRow for CatalogOption {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let values_str: String = row.get(4)?;
        Ok(CatalogOption {
            id: row.get(0)?,
            product_id: row.get(1)?,
            name: row.get(2)?,
            position: row.get(3)?,
            values: serde_json::from_str(&values_str).unwrap_or_default(),
        })
    }
}

impl FromRow for CatalogMedia {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CatalogMedia {
            id: row.get(0)?,
            product_id: row.get(1)?,
            src: row.get(2)?,
            alt_text: row.get(3)?,
            position: row.get(4)?,
            media_type: row.get(5)?,
        })
    }
}

impl FromRow for CatalogCollection {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CatalogCollection {
            id: row.get(0)?,
            external_id: row.get(1)?,
            handle: row.get(2)?,
            title: row.get(3)?,
            description_html: row.get(4)?,
            sort_order: row.get(5)?,
            source_updated_at: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            deleted_at: row.get(9)?,
        })
    }
}
