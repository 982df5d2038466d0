use std::str::FromStr;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::crypto::MasterKey;
use crate::error::{AppError, Result};
use crate::models::*;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

const ORDER_COLS: &str = "id, store_id, customer_name, customer_email, customer_phone, items, \
                          subtotal, total, status, provider_order_id, notes, payment_method, \
                          created_at, updated_at";

fn order_from_row(row: &Row) -> rusqlite::Result<Order> {
    let items_json: String = row.get(5)?;
    let items: Vec<OrderItem> = serde_json::from_str(&items_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    let status_str: String = row.get(8)?;
    let status = OrderStatus::from_str(&status_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(Order {
        id: row.get(0)?,
        store_id: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        customer_phone: row.get(4)?,
        items,
        subtotal: row.get(6)?,
        total: row.get(7)?,
        status,
        provider_order_id: row.get(9)?,
        notes: row.get(10)?,
        payment_method: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

// ============ Stores ============

pub fn create_store(conn: &Connection, input: &CreateStore) -> Result<Store> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO stores (id, name, currency, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, &input.name, &input.currency, now],
    )?;

    Ok(Store {
        id,
        name: input.name.clone(),
        currency: input.currency.clone(),
        created_at: now,
    })
}

pub fn get_store_by_id(conn: &Connection, id: &str) -> Result<Option<Store>> {
    let store = conn
        .query_row(
            "SELECT id, name, currency, created_at FROM stores WHERE id = ?1",
            params![id],
            |row| {
                Ok(Store {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    currency: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(store)
}

// ============ Products ============

pub fn create_product(conn: &Connection, store_id: &str, input: &CreateProduct) -> Result<Product> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO products (id, store_id, name, price, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, store_id, &input.name, input.price, now],
    )?;

    Ok(Product {
        id,
        store_id: store_id.to_string(),
        name: input.name.clone(),
        price: input.price,
        created_at: now,
    })
}

/// Fetch a product scoped to its store: an id from another tenant's catalog
/// must not price this store's order.
pub fn get_product_by_id(
    conn: &Connection,
    store_id: &str,
    id: &str,
) -> Result<Option<Product>> {
    let product = conn
        .query_row(
            "SELECT id, store_id, name, price, created_at FROM products \
             WHERE id = ?1 AND store_id = ?2",
            params![id, store_id],
            |row| {
                Ok(Product {
                    id: row.get(0)?,
                    store_id: row.get(1)?,
                    name: row.get(2)?,
                    price: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(product)
}

// ============ Store payment configs ============

/// Store one provider's credential set, sealed with the store's derived key.
pub fn upsert_payment_config(
    conn: &Connection,
    master_key: &MasterKey,
    store_id: &str,
    provider: &str,
    config_json: &serde_json::Value,
) -> Result<()> {
    let plaintext = serde_json::to_vec(config_json)?;
    let sealed = master_key.seal(store_id, &plaintext)?;

    conn.execute(
        "INSERT INTO store_payment_configs (store_id, provider, config, updated_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (store_id, provider) DO UPDATE SET config = ?3, updated_at = ?4",
        params![store_id, provider, sealed, now()],
    )?;
    Ok(())
}

pub fn delete_payment_config(conn: &Connection, store_id: &str, provider: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM store_payment_configs WHERE store_id = ?1 AND provider = ?2",
        params![store_id, provider],
    )?;
    Ok(affected > 0)
}

/// Assemble the full credential bundle for a store. Rows naming a provider
/// this build does not know are skipped with a warning rather than failing
/// the whole bundle.
pub fn get_payment_config(
    conn: &Connection,
    master_key: &MasterKey,
    store_id: &str,
) -> Result<StorePaymentConfig> {
    let mut stmt = conn.prepare(
        "SELECT provider, config FROM store_payment_configs WHERE store_id = ?1",
    )?;
    let rows = stmt.query_map(params![store_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;

    let mut config = StorePaymentConfig::default();
    for row in rows {
        let (provider, sealed) = row?;
        let plaintext = master_key.open(store_id, &sealed)?;
        match provider.as_str() {
            "paypal" => config.paypal = Some(serde_json::from_slice(&plaintext)?),
            "stripe" => config.stripe = Some(serde_json::from_slice(&plaintext)?),
            "fedapay" => config.fedapay = Some(serde_json::from_slice(&plaintext)?),
            "kkiapay" => config.kkiapay = Some(serde_json::from_slice(&plaintext)?),
            "cinetpay" => config.cinetpay = Some(serde_json::from_slice(&plaintext)?),
            other => {
                tracing::warn!("Unknown provider config row for store {}: {}", store_id, other);
            }
        }
    }
    Ok(config)
}

// ============ Orders ============

/// Create an order with server-recomputed totals.
///
/// Unit prices are re-fetched from the store's catalog; submitted prices are
/// ignored. Items whose id is not in this store's catalog are dropped (the
/// rest of the cart still goes through); an order with no surviving items
/// fails with `empty_cart`.
pub fn create_order(conn: &Connection, store_id: &str, input: &CreateOrder) -> Result<Order> {
    let store = get_store_by_id(conn, store_id)?
        .ok_or_else(|| AppError::StoreNotFound(store_id.to_string()))?;

    let mut items = Vec::with_capacity(input.items.len());
    for line in &input.items {
        if line.quantity < 1 {
            return Err(AppError::BadRequest("Item quantity must be positive".into()));
        }
        match get_product_by_id(conn, &store.id, &line.product_id)? {
            Some(product) => items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
            }),
            None => {
                tracing::warn!(
                    "Dropping unknown product {} from order for store {}",
                    line.product_id,
                    store.id
                );
            }
        }
    }

    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let subtotal: i64 = items.iter().map(|i| i.unit_price * i.quantity).sum();
    let total = subtotal;

    let id = gen_id();
    let now = now();
    let items_json = serde_json::to_string(&items)?;

    conn.execute(
        "INSERT INTO orders (id, store_id, customer_name, customer_email, customer_phone, \
                             items, subtotal, total, status, provider_order_id, notes, \
                             payment_method, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', NULL, ?9, ?10, ?11, ?11)",
        params![
            &id,
            &store.id,
            &input.customer.name,
            &input.customer.email,
            &input.customer.phone,
            &items_json,
            subtotal,
            total,
            &input.notes,
            &input.payment_method,
            now
        ],
    )?;

    Ok(Order {
        id,
        store_id: store.id,
        customer_name: input.customer.name.clone(),
        customer_email: input.customer.email.clone(),
        customer_phone: input.customer.phone.clone(),
        items,
        subtotal,
        total,
        status: OrderStatus::Pending,
        provider_order_id: None,
        notes: input.notes.clone(),
        payment_method: input.payment_method.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> Result<Option<Order>> {
    let order = conn
        .query_row(
            &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
            params![id],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

pub fn list_orders_by_store(conn: &Connection, store_id: &str) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM orders WHERE store_id = ?1 ORDER BY created_at DESC",
        ORDER_COLS
    ))?;
    let orders = stmt
        .query_map(params![store_id], order_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(orders)
}

/// Primary correlation lookup: exact match on the stored provider
/// transaction reference.
pub fn get_order_by_provider_ref(conn: &Connection, provider_ref: &str) -> Result<Option<Order>> {
    let order = conn
        .query_row(
            &format!(
                "SELECT {} FROM orders WHERE provider_order_id = ?1",
                ORDER_COLS
            ),
            params![provider_ref],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

/// Legacy correlation lookup: substring search in the free-text notes field,
/// oldest first, first match only. Orders created before `provider_order_id`
/// existed carried the transaction reference there.
pub fn find_order_by_note_fragment(conn: &Connection, fragment: &str) -> Result<Option<Order>> {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let order = conn
        .query_row(
            &format!(
                "SELECT {} FROM orders WHERE notes LIKE '%' || ?1 || '%' ESCAPE '\\' \
                 ORDER BY created_at ASC LIMIT 1",
                ORDER_COLS
            ),
            params![escaped],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

pub fn set_order_provider_ref(conn: &Connection, order_id: &str, provider_ref: &str) -> Result<()> {
    conn.execute(
        "UPDATE orders SET provider_order_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![provider_ref, now(), order_id],
    )?;
    Ok(())
}

/// Outcome of an idempotent status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// This call performed the transition.
    Applied,
    /// The order was already at (or past) the requested state; nothing to do.
    AlreadyApplied,
}

/// Mark an order paid.
///
/// Single conditional update so that of two concurrent duplicate webhooks
/// exactly one performs `pending -> confirmed`; the other observes the
/// idempotent no-op. Also records which provider settled the order.
pub fn confirm_order_paid(
    conn: &Connection,
    order_id: &str,
    payment_method: &str,
) -> Result<StatusTransition> {
    let affected = conn.execute(
        "UPDATE orders SET status = 'confirmed', payment_method = ?1, updated_at = ?2 \
         WHERE id = ?3 AND status = 'pending'",
        params![payment_method, now(), order_id],
    )?;
    if affected > 0 {
        return Ok(StatusTransition::Applied);
    }
    resolve_failed_cas(conn, order_id, OrderStatus::Confirmed)
}

/// Degraded fallback for [`confirm_order_paid`]: writes only the status
/// column, still guarded by the same compare-and-swap.
pub fn force_confirm_order(conn: &Connection, order_id: &str) -> Result<StatusTransition> {
    let affected = conn.execute(
        "UPDATE orders SET status = 'confirmed' WHERE id = ?1 AND status = 'pending'",
        params![order_id],
    )?;
    if affected > 0 {
        return Ok(StatusTransition::Applied);
    }
    resolve_failed_cas(conn, order_id, OrderStatus::Confirmed)
}

/// Forward-only status transition (Contract B).
///
/// Allowed: pending->confirmed, confirmed->shipped, shipped->delivered,
/// {pending,confirmed}->cancelled. Re-confirming an order that is already
/// confirmed or later is a silent no-op, which is what makes webhook replay
/// safe. Everything else is `invalid_transition`.
pub fn transition_order_status(
    conn: &Connection,
    order_id: &str,
    next: OrderStatus,
) -> Result<StatusTransition> {
    let preds = OrderStatus::allowed_predecessors(next);
    if preds.is_empty() {
        return resolve_failed_cas(conn, order_id, next);
    }

    // Status names are static strings, safe to inline in the IN clause.
    let in_clause = preds
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let affected = conn.execute(
        &format!(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN ({})",
            in_clause
        ),
        params![next.as_str(), now(), order_id],
    )?;
    if affected > 0 {
        return Ok(StatusTransition::Applied);
    }
    resolve_failed_cas(conn, order_id, next)
}

/// The conditional update matched no row: either the order does not exist,
/// the transition is the idempotent re-confirm, or it is genuinely invalid.
fn resolve_failed_cas(
    conn: &Connection,
    order_id: &str,
    next: OrderStatus,
) -> Result<StatusTransition> {
    let order = get_order_by_id(conn, order_id)?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {}", order_id)))?;

    if next == OrderStatus::Confirmed && order.status.is_at_least_confirmed() {
        return Ok(StatusTransition::AlreadyApplied);
    }
    Err(AppError::InvalidTransition {
        from: order.status,
        to: next,
    })
}
