pub mod checkout;
pub mod orders;
pub mod stores;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::db::AppState;
use crate::rate_limit;

/// Full application router. `checkout_rate_limit` is the per-IP
/// requests-per-minute cap on the endpoints that call out to providers;
/// `None` disables it (tests drive the router without peer addresses).
pub fn router(checkout_rate_limit: Option<u32>) -> Router<AppState> {
    let mut checkout = checkout_router();
    if let Some(rpm) = checkout_rate_limit {
        checkout = checkout.layer(rate_limit::strict_layer(rpm));
    }

    Router::new()
        .merge(webhooks::router())
        .merge(checkout)
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/orders/{order_id}/status", put(orders::update_order_status))
        .route("/stores", post(stores::create_store))
        .route("/stores/{store_id}/orders", get(orders::list_store_orders))
        .route(
            "/stores/{store_id}/payment-config",
            get(stores::get_payment_config),
        )
        .route(
            "/stores/{store_id}/payment-config/{provider}",
            put(stores::put_payment_config),
        )
        .route("/health", get(|| async { "ok" }))
}

/// The endpoints that trigger outbound provider calls.
fn checkout_router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::create_checkout))
        .route("/checkout/confirm", post(checkout::confirm_payment))
}
