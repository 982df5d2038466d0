use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{CartLine, CreateOrder, CustomerInfo};
use crate::payments::{
    self, KkiapayClient, PaymentIntent, PaymentProvider, PaymentResult, PaymentStatus,
};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub store_id: String,
    /// Requested payment method ("paypal", "stripe", "fedapay", "kkiapay",
    /// "cinetpay")
    pub method: String,
    pub items: Vec<CartLine>,
    pub customer: CustomerInfo,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub total: i64,
    pub currency: String,
    pub payment: PaymentResult,
}

/// Create the order, then the payment intent with the ledger's recomputed
/// total. The client-submitted prices never reach a provider.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let provider = PaymentProvider::from_str(&request.method)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown payment method: {}", request.method)))?;

    let (order, store, config) = {
        let conn = state.db.get()?;

        let order = queries::create_order(
            &conn,
            &request.store_id,
            &CreateOrder {
                items: request.items,
                customer: request.customer,
                payment_method: Some(provider.as_str().to_string()),
                notes: None,
            },
        )?;

        let store = queries::get_store_by_id(&conn, &request.store_id)?
            .ok_or_else(|| AppError::StoreNotFound(request.store_id.clone()))?;
        let config = queries::get_payment_config(&conn, &state.master_key, &request.store_id)?;
        (order, store, config)
        // Connection released before any provider call suspends.
    };

    let intent = PaymentIntent {
        amount: order.total,
        currency: store.currency.clone(),
        description: format!("Order {} - {}", order.id, store.name),
        customer_email: order.customer_email.clone(),
        customer_phone: order.customer_phone.clone(),
        customer_name: order.customer_name.clone(),
        success_url: request.success_url.unwrap_or_else(|| {
            crate::util::append_query_params(
                &format!("{}/checkout/success", state.base_url),
                &[("order", &order.id)],
            )
        }),
        cancel_url: request.cancel_url.unwrap_or_else(|| {
            crate::util::append_query_params(
                &format!("{}/checkout/cancel", state.base_url),
                &[("order", &order.id)],
            )
        }),
        notify_url: format!("{}/webhook", state.base_url),
        store_id: store.id.clone(),
        reference: order.id.clone(),
    };

    let payment = payments::create_payment_intent(provider, &config, &intent).await?;

    // Store the provider transaction reference as the primary correlation
    // key for the asynchronous notification that follows.
    if !payment.transaction_id.is_empty() {
        let conn = state.db.get()?;
        queries::set_order_provider_ref(&conn, &order.id, &payment.transaction_id)?;
    }

    if payment.status == PaymentStatus::Failed {
        tracing::warn!(
            order_id = %order.id,
            provider = provider.as_str(),
            error = payment.error.as_deref().unwrap_or("unknown"),
            "payment intent creation failed"
        );
    }

    Ok(Json(CheckoutResponse {
        order_id: order.id,
        total: order.total,
        currency: store.currency,
        payment,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub method: String,
    pub transaction_id: String,
    pub store_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub paid: bool,
}

/// Verification pull for client-driven providers: the success page reports
/// a widget-side completion, and the provider API is asked for the
/// authoritative status before the ledger moves. Does not go through the
/// webhook classifier.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>> {
    let provider = PaymentProvider::from_str(&request.method)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown payment method: {}", request.method)))?;

    if provider != PaymentProvider::Kkiapay {
        return Err(AppError::BadRequest(format!(
            "Server-side confirmation is not supported for {}",
            provider.as_str()
        )));
    }

    let kkiapay_config = {
        let conn = state.db.get()?;
        queries::get_store_by_id(&conn, &request.store_id)?
            .ok_or_else(|| AppError::StoreNotFound(request.store_id.clone()))?;
        queries::get_payment_config(&conn, &state.master_key, &request.store_id)?
            .kkiapay
            .ok_or_else(|| AppError::ProviderNotConfigured("KkiaPay".into()))?
    };

    let verification = KkiapayClient::new(&kkiapay_config)
        .verify_transaction(&request.transaction_id)
        .await?;

    if !verification.is_success() {
        tracing::warn!(
            transaction_id = %request.transaction_id,
            status = %verification.status,
            "kkiapay verification reported a non-success status"
        );
        return Ok(Json(ConfirmResponse {
            success: true,
            paid: false,
        }));
    }

    let conn = state.db.get()?;

    // The widget state carries the order id when the storefront set it;
    // otherwise fall back to the stored correlation key.
    let order = match verification.state.as_deref() {
        Some(order_id) if !order_id.is_empty() => queries::get_order_by_id(&conn, order_id)?,
        _ => queries::get_order_by_provider_ref(&conn, &request.transaction_id)?,
    };

    let order = order.ok_or_else(|| {
        tracing::warn!(
            transaction_id = %request.transaction_id,
            "verified kkiapay payment matches no order"
        );
        AppError::NotFound("No order matches this transaction".into())
    })?;

    // Make replays of the provider's own webhook match on the primary key.
    if order.provider_order_id.is_none() {
        queries::set_order_provider_ref(&conn, &order.id, &request.transaction_id)?;
    }

    queries::confirm_order_paid(&conn, &order.id, provider.as_str())?;

    Ok(Json(ConfirmResponse {
        success: true,
        paid: true,
    }))
}
