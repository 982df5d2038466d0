use crate::error::Result;

use super::DbPool;

/// Create tables and indexes if they do not exist yet.
pub fn init_db(pool: &DbPool) -> Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stores (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            currency    TEXT NOT NULL DEFAULT 'XOF',
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS products (
            id          TEXT PRIMARY KEY,
            store_id    TEXT NOT NULL REFERENCES stores(id),
            name        TEXT NOT NULL,
            price       INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_products_store ON products(store_id);

        CREATE TABLE IF NOT EXISTS orders (
            id                 TEXT PRIMARY KEY,
            store_id           TEXT NOT NULL REFERENCES stores(id),
            customer_name      TEXT,
            customer_email     TEXT NOT NULL,
            customer_phone     TEXT,
            items              TEXT NOT NULL,
            subtotal           INTEGER NOT NULL,
            total              INTEGER NOT NULL,
            status             TEXT NOT NULL DEFAULT 'pending',
            provider_order_id  TEXT,
            notes              TEXT,
            payment_method     TEXT,
            created_at         INTEGER NOT NULL,
            updated_at         INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_orders_store ON orders(store_id);
        CREATE INDEX IF NOT EXISTS idx_orders_provider_ref ON orders(provider_order_id);

        CREATE TABLE IF NOT EXISTS store_payment_configs (
            store_id    TEXT NOT NULL REFERENCES stores(id),
            provider    TEXT NOT NULL,
            config      BLOB NOT NULL,
            updated_at  INTEGER NOT NULL,
            PRIMARY KEY (store_id, provider)
        );
        ",
    )?;

    Ok(())
}
