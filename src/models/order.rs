use serde::{Deserialize, Serialize};

/// Order lifecycle. Forward-only: `pending -> confirmed -> shipped ->
/// delivered`, with `cancelled` reachable from `pending` and `confirmed`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Payment has been applied (webhook replays for these are no-ops).
    pub fn is_at_least_confirmed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }

    /// Statuses allowed to move to `next`.
    pub fn allowed_predecessors(next: OrderStatus) -> &'static [OrderStatus] {
        match next {
            OrderStatus::Pending => &[],
            OrderStatus::Confirmed => &[OrderStatus::Pending],
            OrderStatus::Shipped => &[OrderStatus::Confirmed],
            OrderStatus::Delivered => &[OrderStatus::Shipped],
            OrderStatus::Cancelled => &[OrderStatus::Pending, OrderStatus::Confirmed],
        }
    }
}

/// Snapshot of a catalog line at order creation time. Never re-read from the
/// live catalog afterwards, so the invoice stays stable under price edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub store_id: String,
    pub customer_name: Option<String>,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub total: i64,
    pub status: OrderStatus,
    /// Provider-issued transaction reference, the primary webhook
    /// correlation key.
    pub provider_order_id: Option<String>,
    /// Free text. Older integrations embedded the provider transaction id
    /// here; still searched as a fallback correlation path.
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A submitted cart line. `unit_price` is accepted for backward
/// compatibility with older storefront clients and ignored: the ledger
/// re-fetches the authoritative price from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrder {
    pub items: Vec<CartLine>,
    pub customer: CustomerInfo,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}
