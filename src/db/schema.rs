use rusqlite::Connection;

/// Initialize the catalog schema.
///
/// Soft delete: `deleted_at` = timestamp when deleted, NULL = active.
/// `external_id` columns hold the upstream platform's identifiers and are
/// unique outright (upstream ids are immutable and never reused); handles are
/// unique only among non-deleted rows, since a deleted product's handle may be
/// reused by a new one.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Products mirrored from the upstream platform
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            handle TEXT NOT NULL,
            title TEXT NOT NULL,
            description_html TEXT,
            vendor TEXT,
            product_type TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            published_at INTEGER,
            source_updated_at INTEGER,
            linkage_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_products_handle_active ON products(handle) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_products_active ON products(id) WHERE deleted_at IS NULL;
        -- Push reconciliation scans unlinked publishable products in creation order
        CREATE INDEX IF NOT EXISTS idx_products_unlinked ON products(created_at) WHERE linkage_id IS NULL AND deleted_at IS NULL;

        -- Variants, owned by exactly one product, upserted by external_id
        CREATE TABLE IF NOT EXISTS variants (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            external_id TEXT NOT NULL UNIQUE,
            title TEXT,
            sku TEXT,
            price_amount REAL NOT NULL DEFAULT 0,
            price_currency TEXT NOT NULL DEFAULT 'USD',
            compare_at_price_amount REAL,
            position INTEGER NOT NULL DEFAULT 1,
            inventory_policy TEXT,
            taxable INTEGER NOT NULL DEFAULT 1,
            source_updated_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_variants_product ON variants(product_id, position);

        -- Options and media carry no per-item diff in webhook payloads and are
        -- replaced wholesale on every product update
        CREATE TABLE IF NOT EXISTS product_options (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            position INTEGER NOT NULL,
            option_values TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_product_options_product ON product_options(product_id, position);

        CREATE TABLE IF NOT EXISTS product_media (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            src TEXT NOT NULL,
            alt_text TEXT,
            position INTEGER NOT NULL,
            media_type TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_product_media_product ON product_media(product_id, position);

        -- Collections mirror products' lifecycle but have no nested entities
        CREATE TABLE IF NOT EXISTS collections (
            id TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            handle TEXT NOT NULL,
            title TEXT NOT NULL,
            description_html TEXT,
            sort_order TEXT,
            source_updated_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_collections_handle_active ON collections(handle) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_collections_active ON collections(id) WHERE deleted_at IS NULL;
        "#,
    )?;
    Ok(())
}
