//! Tests for the unified POST /webhook endpoint: classification,
//! reconciliation, idempotent replay, and the acknowledge-everything
//! response contract.

use axum::http::StatusCode;
use serde_json::json;

use comptoir::db::queries;
use comptoir::models::OrderStatus;

mod common;
use common::*;

use hmac::{Hmac, Mac};
use sha2::Sha256;

#[tokio::test]
async fn cinetpay_success_confirms_order() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 2, None);
        assert_eq!(order.total, 25000);
        queries::set_order_provider_ref(&conn, &order.id, "CP-123").unwrap();
        order_id = order.id;
    }

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        json!({ "cpm_trans_id": "CP-123", "cpm_result": "00" })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Confirmed);
}

#[tokio::test]
async fn replayed_webhook_is_a_silent_no_op() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 2, None);
        queries::set_order_provider_ref(&conn, &order.id, "CP-123").unwrap();
        order_id = order.id;
    }

    let payload = json!({ "cpm_trans_id": "CP-123", "cpm_result": "00" }).to_string();

    for _ in 0..3 {
        let response = post_raw(
            app(state.clone()),
            "/webhook",
            payload.as_bytes(),
            &[("content-type", "application/json")],
        )
        .await;
        let status = response.status();
        let body = read_json(response).await;
        assert_ok_received(status, &body);
    }

    assert_eq!(order_status(&state, &order_id), OrderStatus::Confirmed);
}

#[tokio::test]
async fn concurrent_duplicate_webhooks_both_succeed() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "CP-777").unwrap();
        order_id = order.id;
    }

    let payload = json!({ "cpm_trans_id": "CP-777", "cpm_result": "00" }).to_string();
    let (a, b) = tokio::join!(
        post_raw(
            app(state.clone()),
            "/webhook",
            payload.as_bytes(),
            &[("content-type", "application/json")],
        ),
        post_raw(
            app(state.clone()),
            "/webhook",
            payload.as_bytes(),
            &[("content-type", "application/json")],
        ),
    );

    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Confirmed);
}

#[tokio::test]
async fn unmatched_correlation_id_is_acknowledged_without_state_change() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "CP-123").unwrap();
        order_id = order.id;
    }

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        json!({ "cpm_trans_id": "CP-999", "cpm_result": "00" })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Pending);
}

#[tokio::test]
async fn legacy_notes_fallback_matches_order_without_provider_ref() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(
            &conn,
            &store.id,
            &product.id,
            1,
            Some("Paiement mobile money ref TXN-999 (ancienne integration)"),
        );
        assert!(order.provider_order_id.is_none());
        order_id = order.id;
    }

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        json!({ "transactionId": "TXN-999", "isPaymentSucces": true })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Confirmed);
}

#[tokio::test]
async fn short_correlation_ids_never_use_the_notes_fallback() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        // "123" appears in the notes but is far too short to be a safe match.
        let order = seed_order(&conn, &store.id, &product.id, 1, Some("commande 123 urgente"));
        order_id = order.id;
    }

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        json!({ "transactionId": "123", "isPaymentSucces": true })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Pending);
}

#[tokio::test]
async fn unidentified_payload_is_acknowledged() {
    let state = create_test_state();

    let response = post_raw(
        app(state),
        "/webhook",
        json!({ "hello": "world", "nested": { "a": 1 } })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
}

#[tokio::test]
async fn form_encoded_body_is_acknowledged_without_processing() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "CP-123").unwrap();
        order_id = order.id;
    }

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        b"cpm_trans_id=CP-123&cpm_result=00",
        &[("content-type", "application/x-www-form-urlencoded")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    // Documented limitation: legacy form payloads are not processed.
    assert_eq!(order_status(&state, &order_id), OrderStatus::Pending);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let state = create_test_state();

    let response = post_raw(
        app(state),
        "/webhook",
        b"{not valid json",
        &[("content-type", "application/json")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_success_provider_event_is_ignored() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "CP-123").unwrap();
        order_id = order.id;
    }

    // Same provider, failed result code: classified but not acted on.
    let response = post_raw(
        app(state.clone()),
        "/webhook",
        json!({ "cpm_trans_id": "CP-123", "cpm_result": "627" })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Pending);
}

type HmacSha256 = Hmac<Sha256>;

fn stripe_signature(secret: &str, timestamp: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn stripe_webhook_with_valid_signature_confirms_order() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "cs_test_42").unwrap();
        set_stripe_config(&state, &store.id, Some("whsec_test"));
        order_id = order.id;
    }

    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_test_42" } }
    })
    .to_string();
    let signature = stripe_signature("whsec_test", "1700000000", payload.as_bytes());

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        payload.as_bytes(),
        &[
            ("content-type", "application/json"),
            ("stripe-signature", &signature),
        ],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Confirmed);
}

#[tokio::test]
async fn stripe_webhook_with_bad_signature_is_acknowledged_but_ignored() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "cs_test_42").unwrap();
        set_stripe_config(&state, &store.id, Some("whsec_test"));
        order_id = order.id;
    }

    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_test_42" } }
    })
    .to_string();
    let signature = stripe_signature("whsec_other", "1700000000", payload.as_bytes());

    let response = post_raw(
        app(state.clone()),
        "/webhook",
        payload.as_bytes(),
        &[
            ("content-type", "application/json"),
            ("stripe-signature", &signature),
        ],
    )
    .await;

    let status = response.status();
    let body = read_json(response).await;
    assert_ok_received(status, &body);
    assert_eq!(order_status(&state, &order_id), OrderStatus::Pending);
}

#[tokio::test]
async fn webhook_success_for_cancelled_order_fails_loudly() {
    let state = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::set_order_provider_ref(&conn, &order.id, "CP-123").unwrap();
        queries::transition_order_status(&conn, &order.id, OrderStatus::Cancelled).unwrap();
    }

    let response = post_raw(
        app(state),
        "/webhook",
        json!({ "cpm_trans_id": "CP-123", "cpm_result": "00" })
            .to_string()
            .as_bytes(),
        &[("content-type", "application/json")],
    )
    .await;

    // A paid-but-cancelled order is a data problem, not something to
    // acknowledge away.
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"], "invalid_transition");
}
