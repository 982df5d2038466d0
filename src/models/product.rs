use serde::{Deserialize, Serialize};

/// Minimal catalog record. Catalog management lives in the storefront
/// platform; the reconciliation engine only reads unit prices from it when
/// computing trusted order totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Unit price in the store currency (major unit for zero-decimal
    /// currencies such as XOF).
    pub price: i64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: i64,
}
