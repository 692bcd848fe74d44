use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use pbg_common::Money;
use pointboard_payment_engine::db_types::{
    FulfillmentStatus,
    Json,
    Order,
    OrderRef,
    PaymentMethod,
    PaymentStatus,
    ShippingDetails,
    Transaction,
    TransactionStatus,
};

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn post_request(
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = TestRequest::post().uri(path).set_json(&body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn post_raw_request(path: &str, body: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::post().uri(path).set_payload(body.to_string()).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub fn seed_order(reference: &str, total: i64, status: PaymentStatus) -> Order {
    let settled = status == PaymentStatus::Paid;
    Order {
        id: 1,
        reference: OrderRef(reference.to_string()),
        customer_id: None,
        shipping: Json(ShippingDetails {
            recipient: "Nguyen Van A".to_string(),
            phone: "0901234567".to_string(),
            address: "12 Nguyen Hue, Q1".to_string(),
            city: None,
            note: None,
        }),
        total_amount: Money::from(total),
        payment_method: PaymentMethod::QrTransfer,
        payment_status: status,
        fulfillment_status: FulfillmentStatus::Pending,
        gateway_txn_id: settled.then(|| "92704".to_string()),
        gateway_name: settled.then(|| "MBBank".to_string()),
        transfer_amount: settled.then(|| Money::from(total)),
        settled_at: settled.then(|| Utc.with_ymd_and_hms(2024, 5, 25, 21, 11, 2).unwrap()),
        created_at: Utc.with_ymd_and_hms(2024, 5, 25, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 25, 13, 30, 0).unwrap(),
    }
}

pub fn seed_transaction(status: TransactionStatus) -> Transaction {
    Transaction {
        id: 1,
        gateway_txn_id: Some("92704".to_string()),
        order_reference: Some(OrderRef("ABC123".to_string())),
        amount: Money::from(150_000),
        raw_payload: "{}".to_string(),
        source_ip: Some("103.255.238.9".to_string()),
        status,
        created_at: Utc.with_ymd_and_hms(2024, 5, 25, 21, 11, 2).unwrap(),
    }
}
