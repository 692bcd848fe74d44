use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use pointboard_payment_engine::{
    db_types::{FulfillmentStatus, Json, Order, PaymentStatus},
    events::EventProducers,
    OrderFlowApi,
    OrderQueryApi,
};
use serde_json::json;

use super::helpers::{get_request, post_request, seed_order};
use crate::{
    config::BankConfig,
    endpoint_tests::mocks::{MockOrderManager, MockPaymentGateway},
    routes::{CreateOrderRoute, OrderByReferenceRoute, OrderStatusRoute},
};

fn checkout_body(total: Option<i64>) -> serde_json::Value {
    let mut body = json!({
        "items": [
            {"product_ref": "catan", "name": "Catan", "unit_price": 120_000, "quantity": 1}
        ],
        "shipping": {"recipient": "Nguyen Van A", "phone": "0901234567", "address": "12 Nguyen Hue, Q1"},
        "shipping_fee": 30_000
    });
    if let Some(total) = total {
        body["total_amount"] = json!(total);
    }
    body
}

#[actix_web::test]
async fn create_order_returns_reference_and_qr() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/order", checkout_body(Some(150_000)), configure_create).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).expect("Response should be JSON");
    let reference = response["reference"].as_str().expect("Response should carry a reference");
    assert!(reference.starts_with("PB"));
    assert_eq!(response["payment_status"], "Pending");
    let qr_url = response["qr_url"].as_str().expect("QR transfer orders should carry a QR URL");
    assert!(qr_url.contains("acc=0123456789"));
    assert!(qr_url.contains(&format!("des=PointBoard-{reference}")));
}

#[actix_web::test]
async fn create_order_without_total_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/order", checkout_body(None), configure_create).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("totalAmount is required"));
}

#[actix_web::test]
async fn create_order_with_duplicate_reference_conflicts() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/order", checkout_body(Some(150_000)), configure_create_duplicate).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already exists"));
}

#[actix_web::test]
async fn status_for_paid_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/order/ABC123/status", configure_query_paid).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["paymentState"], "Paid");
    assert_eq!(response["paymentVerified"], true);
    assert_eq!(response["amountPaid"], 150_000);
}

#[actix_web::test]
async fn status_for_unknown_order_is_404() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("/order/GHOST1/status", configure_query_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn full_order_includes_line_items() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/order/ABC123", configure_query_paid).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["reference"], "ABC123");
    assert!(response["items"].as_array().unwrap().is_empty());
}

fn order_from_spec(spec: pointboard_payment_engine::db_types::NewOrder) -> Order {
    Order {
        id: 1,
        reference: spec.reference,
        customer_id: spec.customer_id,
        shipping: Json(spec.shipping),
        total_amount: spec.total_amount,
        payment_method: spec.payment_method,
        payment_status: PaymentStatus::Pending,
        fulfillment_status: FulfillmentStatus::Pending,
        gateway_txn_id: None,
        gateway_name: None,
        transfer_amount: None,
        settled_at: None,
        created_at: spec.created_at,
        updated_at: Utc::now(),
    }
}

fn bank_config() -> BankConfig {
    BankConfig { account: "0123456789".to_string(), code: "MBBank".to_string() }
}

fn configure_create(cfg: &mut ServiceConfig) {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_insert_order().returning(|spec| Ok(order_from_spec(spec)));
    let api = OrderFlowApi::new(gateway, EventProducers::default());
    cfg.service(CreateOrderRoute::<MockPaymentGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(bank_config()));
}

fn configure_create_duplicate(cfg: &mut ServiceConfig) {
    use pointboard_payment_engine::traits::PaymentGatewayError;
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_insert_order()
        .returning(|spec| Err(PaymentGatewayError::OrderAlreadyExists(spec.reference)));
    let api = OrderFlowApi::new(gateway, EventProducers::default());
    cfg.service(CreateOrderRoute::<MockPaymentGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(bank_config()));
}

fn configure_query_paid(cfg: &mut ServiceConfig) {
    let mut manager = MockOrderManager::new();
    manager.expect_order_by_reference().returning(|_| Ok(Some(seed_order("ABC123", 150_000, PaymentStatus::Paid))));
    manager.expect_line_items_for_order().returning(|_| Ok(vec![]));
    let api = OrderQueryApi::new(manager);
    cfg.service(OrderStatusRoute::<MockOrderManager>::new())
        .service(OrderByReferenceRoute::<MockOrderManager>::new())
        .app_data(web::Data::new(api));
}

fn configure_query_missing(cfg: &mut ServiceConfig) {
    let mut manager = MockOrderManager::new();
    manager.expect_order_by_reference().returning(|_| Ok(None));
    let api = OrderQueryApi::new(manager);
    cfg.service(OrderStatusRoute::<MockOrderManager>::new()).app_data(web::Data::new(api));
}
