//! End-to-end flow over the HTTP layer with a real SQLite store: checkout, webhook settlement, status polling.
//!
//! The app instance is rebuilt for every request; the SQLite database behind it is the shared state, exactly as it
//! is across worker restarts in production.

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use pointboard_payment_engine::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};
use pointboard_payment_server::{
    config::{BankConfig, SePayConfig, ServerOptions},
    routes::{health, CreateOrderRoute, OrderByReferenceRoute, OrderStatusRoute, RecentTransactionsRoute},
    sepay_routes::SepayWebhookRoute,
};
use serde_json::json;

async fn test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database pool")
}

macro_rules! test_app {
    ($db:expr) => {{
        let flow_api = OrderFlowApi::new($db.clone(), EventProducers::default());
        let query_api = OrderQueryApi::new($db.clone());
        let app = App::new()
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(ServerOptions { use_x_forwarded_for: false, use_forwarded: false }))
            .app_data(web::Data::new(SePayConfig { whitelist: None, skip_ip_check: false }))
            .app_data(web::Data::new(BankConfig { account: "0123456789".to_string(), code: "MBBank".to_string() }))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(OrderByReferenceRoute::<SqliteDatabase>::new())
            .service(RecentTransactionsRoute::<SqliteDatabase>::new())
            .service(web::scope("/sepay").service(SepayWebhookRoute::<SqliteDatabase>::new()));
        test::init_service(app).await
    }};
}

async fn post_json(db: &SqliteDatabase, path: &str, body: serde_json::Value) -> serde_json::Value {
    let service = test_app!(db);
    let req = TestRequest::post().uri(path).set_json(&body).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK, "POST {path} failed");
    test::read_body_json(res).await
}

async fn get_json(db: &SqliteDatabase, path: &str) -> serde_json::Value {
    let service = test_app!(db);
    let req = TestRequest::get().uri(path).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK, "GET {path} failed");
    test::read_body_json(res).await
}

fn checkout_body() -> serde_json::Value {
    json!({
        "customer_id": "cust-42",
        "items": [
            {"product_ref": "catan", "name": "Catan", "unit_price": 90_000, "quantity": 1},
            {"product_ref": "dixit", "name": "Dixit", "unit_price": 30_000, "quantity": 1}
        ],
        "shipping": {"recipient": "Nguyen Van A", "phone": "0901234567", "address": "12 Nguyen Hue, Q1"},
        "shipping_fee": 30_000,
        "total_amount": 150_000
    })
}

fn webhook_body(content: &str, amount: i64, txn_id: i64) -> serde_json::Value {
    json!({
        "id": txn_id,
        "gateway": "MBBank",
        "transactionDate": "2024-05-25 21:11:02",
        "accountNumber": "0123456789",
        "content": content,
        "transferType": "in",
        "transferAmount": amount,
        "referenceCode": "MBVCB.3278907687"
    })
}

#[actix_web::test]
async fn checkout_webhook_and_status_flow() {
    let db = test_db().await;

    // Checkout: the server assigns the reference and hands back the QR payload.
    let created = post_json(&db, "/order", checkout_body()).await;
    let reference = created["reference"].as_str().expect("Order should carry a reference").to_string();
    let qr_url = created["qr_url"].as_str().unwrap();
    assert!(qr_url.contains(&format!("des=PointBoard-{reference}")));
    assert!(qr_url.contains("amount=150000"));

    // Nothing has settled yet.
    let status = get_json(&db, &format!("/order/{reference}/status")).await;
    assert_eq!(status["paymentVerified"], false);
    assert_eq!(status["paymentState"], "Pending");

    // The bank transfer lands and SePay calls back.
    let ack = post_json(&db, "/sepay/webhook", webhook_body(&format!("PointBoard-{reference}"), 150_000, 1001)).await;
    assert_eq!(ack["success"], true);

    // The poller sees the settlement.
    let status = get_json(&db, &format!("/order/{reference}/status")).await;
    assert_eq!(status["paymentVerified"], true);
    assert_eq!(status["paymentState"], "Paid");
    assert_eq!(status["amountPaid"], 150_000);

    // The order now carries the settlement details, and the audit log has exactly one successful record.
    let order = get_json(&db, &format!("/order/{reference}")).await;
    assert_eq!(order["gateway_txn_id"], "1001");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    let transactions = get_json(&db, "/transactions").await;
    let records = transactions.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "Success");
}

#[actix_web::test]
async fn mismatched_amount_does_not_settle() {
    let db = test_db().await;

    let created = post_json(&db, "/order", checkout_body()).await;
    let reference = created["reference"].as_str().unwrap().to_string();

    // A transfer of the wrong amount is acknowledged, logged, and changes nothing.
    let ack = post_json(&db, "/sepay/webhook", webhook_body(&format!("PointBoard-{reference}"), 140_000, 2001)).await;
    assert_eq!(ack["success"], true);
    let status = get_json(&db, &format!("/order/{reference}/status")).await;
    assert_eq!(status["paymentVerified"], false);
    assert_eq!(status["paymentState"], "Pending");

    // A follow-up transfer with the exact amount settles the order.
    post_json(&db, "/sepay/webhook", webhook_body(&format!("PointBoard-{reference}"), 150_000, 2002)).await;
    let status = get_json(&db, &format!("/order/{reference}/status")).await;
    assert_eq!(status["paymentVerified"], true);

    let transactions = get_json(&db, "/transactions").await;
    assert_eq!(transactions.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn replayed_webhook_settles_once_and_logs_twice() {
    let db = test_db().await;

    let created = post_json(&db, "/order", checkout_body()).await;
    let reference = created["reference"].as_str().unwrap().to_string();
    let payload = webhook_body(&format!("PointBoard-{reference}"), 150_000, 3001);

    post_json(&db, "/sepay/webhook", payload.clone()).await;
    let first = get_json(&db, &format!("/order/{reference}")).await;

    // The gateway retries the exact same delivery.
    post_json(&db, "/sepay/webhook", payload).await;
    let second = get_json(&db, &format!("/order/{reference}")).await;
    assert_eq!(first["settled_at"], second["settled_at"]);
    assert_eq!(second["payment_status"], "Paid");

    let transactions = get_json(&db, "/transactions").await;
    assert_eq!(transactions.as_array().unwrap().len(), 2);
}
