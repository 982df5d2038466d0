//! Tests for the order read/transition endpoints.

use axum::http::StatusCode;
use serde_json::json;

use comptoir::db::queries;
use comptoir::models::OrderStatus;

mod common;
use common::*;

#[tokio::test]
async fn get_order_returns_the_snapshot() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 2, None);
        order_id = order.id;
    }

    let response = get(app(state), &format!("/orders/{}", order_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 25000);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["items"][0]["name"], "Pagne");
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let state = create_test_state();
    let response = get(app(state), "/orders/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_orders_can_be_filtered_by_status() {
    let state = create_test_state();
    let store_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let paid = seed_order(&conn, &store.id, &product.id, 1, None);
        seed_order(&conn, &store.id, &product.id, 1, None);
        queries::confirm_order_paid(&conn, &paid.id, "stripe").unwrap();
        store_id = store.id;
    }

    let response = get(
        app(state.clone()),
        &format!("/stores/{}/orders?status=confirmed", store_id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["status"], "confirmed");

    let response = get(app(state), &format!("/stores/{}/orders", store_id)).await;
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn merchant_can_walk_an_order_forward() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        queries::confirm_order_paid(&conn, &order.id, "cinetpay").unwrap();
        order_id = order.id;
    }

    let response = put_json(
        app(state.clone()),
        &format!("/orders/{}/status", order_id),
        json!({ "status": "shipped" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "shipped");
    assert_eq!(order_status(&state, &order_id), OrderStatus::Shipped);
}

#[tokio::test]
async fn backward_transition_is_a_conflict() {
    let state = create_test_state();
    let order_id;
    {
        let conn = state.db.get().unwrap();
        let store = seed_store(&conn, "Boutique Dakar");
        let product = seed_product(&conn, &store.id, "Pagne", 12500);
        let order = seed_order(&conn, &store.id, &product.id, 1, None);
        order_id = order.id;
    }

    let response = put_json(
        app(state.clone()),
        &format!("/orders/{}/status", order_id),
        json!({ "status": "delivered" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"], "invalid_transition");
    assert_eq!(order_status(&state, &order_id), OrderStatus::Pending);
}
