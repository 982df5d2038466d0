//! Shared helpers for integration tests: tempfile-backed state, seed data,
//! and request plumbing against the full router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use comptoir::crypto::MasterKey;
use comptoir::db::{AppState, create_pool, init_db, queries};
use comptoir::models::*;

pub fn test_master_key() -> MasterKey {
    MasterKey::from_bytes([42u8; 32])
}

pub fn create_test_state() -> AppState {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("comptoir-test.db");
    let pool = create_pool(db_path.to_str().expect("utf-8 temp path")).expect("Failed to build pool");
    init_db(&pool).expect("Failed to init schema");

    // The pool opens connections lazily; keep the backing directory alive
    // for the whole test process.
    std::mem::forget(dir);

    AppState {
        db: pool,
        master_key: test_master_key(),
        base_url: "http://api.test.local".to_string(),
    }
}

/// Full router without rate limiting (oneshot requests carry no peer addr).
pub fn app(state: AppState) -> Router {
    comptoir::handlers::router(None).with_state(state)
}

pub fn seed_store(conn: &rusqlite::Connection, name: &str) -> Store {
    queries::create_store(
        conn,
        &CreateStore {
            name: name.to_string(),
            currency: "XOF".to_string(),
        },
    )
    .expect("Failed to seed store")
}

pub fn seed_product(conn: &rusqlite::Connection, store_id: &str, name: &str, price: i64) -> Product {
    queries::create_product(
        conn,
        store_id,
        &CreateProduct {
            name: name.to_string(),
            price,
        },
    )
    .expect("Failed to seed product")
}

/// Create a pending order for one product, optionally carrying legacy notes.
pub fn seed_order(
    conn: &rusqlite::Connection,
    store_id: &str,
    product_id: &str,
    quantity: i64,
    notes: Option<&str>,
) -> Order {
    queries::create_order(
        conn,
        store_id,
        &CreateOrder {
            items: vec![CartLine {
                product_id: product_id.to_string(),
                quantity,
                unit_price: None,
            }],
            customer: CustomerInfo {
                name: Some("Awa Diop".to_string()),
                email: "awa@example.test".to_string(),
                phone: Some("+221770000000".to_string()),
            },
            payment_method: None,
            notes: notes.map(String::from),
        },
    )
    .expect("Failed to seed order")
}

pub fn set_kkiapay_config(state: &AppState, store_id: &str) {
    let conn = state.db.get().unwrap();
    queries::upsert_payment_config(
        &conn,
        &state.master_key,
        store_id,
        "kkiapay",
        &serde_json::json!({
            "public_key": "pk_test_widget",
            "private_key": "sk_test_private",
            "sandbox": true
        }),
    )
    .expect("Failed to store kkiapay config");
}

pub fn set_stripe_config(state: &AppState, store_id: &str, webhook_secret: Option<&str>) {
    let conn = state.db.get().unwrap();
    queries::upsert_payment_config(
        &conn,
        &state.master_key,
        store_id,
        "stripe",
        &serde_json::json!({
            "secret_key": "sk_test_x",
            "webhook_secret": webhook_secret,
        }),
    )
    .expect("Failed to store stripe config");
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST raw bytes with arbitrary headers (webhook-style).
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: &[u8],
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body.to_vec())).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn order_status(state: &AppState, order_id: &str) -> OrderStatus {
    let conn = state.db.get().unwrap();
    queries::get_order_by_id(&conn, order_id)
        .unwrap()
        .expect("order should exist")
        .status
}

pub fn assert_ok_received(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], Value::Bool(true));
}
