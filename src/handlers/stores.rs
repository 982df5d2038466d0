use axum::extract::{Path, State};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{CreateStore, PaymentConfigSummary, Store};
use crate::payments::PaymentProvider;

pub async fn create_store(
    State(state): State<AppState>,
    Json(request): Json<CreateStore>,
) -> Result<Json<Store>> {
    let conn = state.db.get()?;
    let store = queries::create_store(&conn, &request)?;
    Ok(Json(store))
}

/// Store owners save one provider's credential set at a time. The body is
/// the provider's own config shape; it is validated by deserializing into
/// the typed struct before being sealed and stored.
pub async fn put_payment_config(
    State(state): State<AppState>,
    Path((store_id, provider)): Path<(String, String)>,
    Json(config): Json<serde_json::Value>,
) -> Result<Json<PaymentConfigSummary>> {
    let provider = PaymentProvider::from_str(&provider)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown provider: {}", provider)))?;

    let conn = state.db.get()?;
    queries::get_store_by_id(&conn, &store_id)?
        .ok_or_else(|| AppError::StoreNotFound(store_id.clone()))?;

    validate_config(provider, &config)?;
    queries::upsert_payment_config(&conn, &state.master_key, &store_id, provider.as_str(), &config)?;

    let full = queries::get_payment_config(&conn, &state.master_key, &store_id)?;
    Ok(Json(PaymentConfigSummary::from(&full)))
}

/// Masked view: which providers are configured, never the secrets.
pub async fn get_payment_config(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<PaymentConfigSummary>> {
    let conn = state.db.get()?;
    queries::get_store_by_id(&conn, &store_id)?
        .ok_or_else(|| AppError::StoreNotFound(store_id.clone()))?;

    let config = queries::get_payment_config(&conn, &state.master_key, &store_id)?;
    Ok(Json(PaymentConfigSummary::from(&config)))
}

fn validate_config(provider: PaymentProvider, config: &serde_json::Value) -> Result<()> {
    use crate::models::*;
    let check = match provider {
        PaymentProvider::Paypal => {
            serde_json::from_value::<PaypalConfig>(config.clone()).map(|_| ())
        }
        PaymentProvider::Stripe => {
            serde_json::from_value::<StripeConfig>(config.clone()).map(|_| ())
        }
        PaymentProvider::Fedapay => {
            serde_json::from_value::<FedapayConfig>(config.clone()).map(|_| ())
        }
        PaymentProvider::Kkiapay => {
            serde_json::from_value::<KkiapayConfig>(config.clone()).map(|_| ())
        }
        PaymentProvider::Cinetpay => {
            serde_json::from_value::<CinetpayConfig>(config.clone()).map(|_| ())
        }
    };
    check.map_err(|e| AppError::BadRequest(format!("Invalid {} config: {}", provider.as_str(), e)))
}
