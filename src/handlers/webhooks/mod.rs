pub mod classify;
pub mod reconcile;

pub use classify::{Classification, ClassifiedEvent, EventKind, classify};
pub use reconcile::{ReconcileOutcome, reconcile};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_payment_webhook))
}

/// Every provider sends back `{"received": true}` with a 200.
///
/// Liberal on purpose: providers treat any non-2xx as "retry forever", and
/// the unmatched cases (unknown shape, no matching order, legacy form
/// payloads) are terminal, not transient. Only a body that should have been
/// JSON and was not earns a 400.
fn ack() -> Response {
    (StatusCode::OK, Json(json!({ "received": true }))).into_response()
}

/// Single inbound notification endpoint for all providers.
///
/// Takes the raw bytes rather than a parsed body: provider identification
/// needs both the unparsed payload and the headers.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let classification = match classify(&body, &headers) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Unparseable webhook body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid payload" })),
            )
                .into_response();
        }
    };

    let event = match classification {
        Classification::FormEncoded => {
            // Known limitation: legacy form-encoded notifications are
            // acknowledged without processing.
            tracing::warn!("form-encoded webhook acknowledged without processing");
            return ack();
        }
        Classification::Unidentified => {
            tracing::warn!(
                body_len = body.len(),
                "unidentified webhook payload, acknowledged"
            );
            return ack();
        }
        Classification::Event(event) => event,
    };

    if event.kind != EventKind::PaymentSuccess {
        tracing::debug!(
            provider = event.provider.as_str(),
            "ignoring non-success provider event"
        );
        return ack();
    }

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "service unavailable" })),
            )
                .into_response();
        }
    };

    match reconcile(&conn, &state.master_key, &event, &body, &headers) {
        Ok(
            ReconcileOutcome::Confirmed { .. }
            | ReconcileOutcome::AlreadyConfirmed { .. }
            | ReconcileOutcome::OrderNotFound
            | ReconcileOutcome::SignatureRejected { .. },
        ) => ack(),
        // invalid_transition and storage failures: loud, surfaced as a
        // failed operation rather than silently acknowledged.
        Err(e) => e.into_response(),
    }
}
