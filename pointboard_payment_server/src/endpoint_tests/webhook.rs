use actix_web::{http::StatusCode, web, web::ServiceConfig};
use pointboard_payment_engine::{
    db_types::{PaymentStatus, TransactionStatus},
    events::EventProducers,
    traits::SettlementOutcome,
    OrderFlowApi,
};
use serde_json::json;

use super::helpers::{post_raw_request, post_request, seed_order, seed_transaction};
use crate::{
    config::{SePayConfig, ServerOptions},
    endpoint_tests::mocks::MockPaymentGateway,
    sepay_routes::SepayWebhookRoute,
};

fn webhook_payload(content: &str, amount: i64) -> serde_json::Value {
    json!({
        "id": 92704,
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
async fn settlement_acknowledged_with_200() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/webhook", webhook_payload("PointBoard-ABC123", 150_000), configure_settling).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert!(response["message"].as_str().unwrap().contains("marked as paid"));
}

#[actix_web::test]
async fn unauthenticated_source_is_logged_and_acknowledged() {
    let _ = env_logger::try_init().ok();
    // The allow-list names a source, the test request has no peer address, so the call is unauthenticated.
    // It must still be answered with a 200 and leave a failed transaction record.
    let (status, body) =
        post_request("/webhook", webhook_payload("PointBoard-ABC123", 150_000), configure_whitelisted).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
}

#[actix_web::test]
async fn garbage_payload_is_logged_and_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_raw_request("/webhook", "this is not json", configure_logging_only).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
}

#[actix_web::test]
async fn outbound_transfer_is_logged_and_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut payload = webhook_payload("PointBoard-ABC123", 150_000);
    payload["transferType"] = json!("out");
    let (status, body) = post_request("/webhook", payload, configure_logging_only).await;
    assert_eq!(status, StatusCode::OK);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert!(response["message"].as_str().unwrap().contains("non-incoming"));
}

fn open_sepay_config() -> SePayConfig {
    SePayConfig { whitelist: None, skip_ip_check: false }
}

fn server_options() -> ServerOptions {
    ServerOptions { use_x_forwarded_for: false, use_forwarded: false }
}

/// Settlement path: the engine is expected to settle exactly once and log nothing else.
fn configure_settling(cfg: &mut ServiceConfig) {
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_settle_order()
        .times(1)
        .returning(|_, _, _| Ok(SettlementOutcome::Settled(seed_order("ABC123", 150_000, PaymentStatus::Paid))));
    let api = OrderFlowApi::new(gateway, EventProducers::default());
    cfg.service(SepayWebhookRoute::<MockPaymentGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(server_options()))
        .app_data(web::Data::new(open_sepay_config()));
}

/// Allow-list configured: the handler must write one failed audit record and never reach settlement.
fn configure_whitelisted(cfg: &mut ServiceConfig) {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_log_transaction().times(1).returning(|_| Ok(seed_transaction(TransactionStatus::Failed)));
    gateway.expect_settle_order().never();
    let api = OrderFlowApi::new(gateway, EventProducers::default());
    let sepay = SePayConfig { whitelist: Some(vec!["103.255.238.9".parse().unwrap()]), skip_ip_check: false };
    cfg.service(SepayWebhookRoute::<MockPaymentGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(server_options()))
        .app_data(web::Data::new(sepay));
}

/// Paths that never reach settlement, but still leave exactly one audit record.
fn configure_logging_only(cfg: &mut ServiceConfig) {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_log_transaction().times(1).returning(|_| Ok(seed_transaction(TransactionStatus::Failed)));
    gateway.expect_settle_order().never();
    let api = OrderFlowApi::new(gateway, EventProducers::default());
    cfg.service(SepayWebhookRoute::<MockPaymentGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(server_options()))
        .app_data(web::Data::new(open_sepay_config()));
}
