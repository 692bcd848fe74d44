use std::fmt::Display;

use pbg_common::Money;
use pointboard_payment_engine::db_types::{NewLineItem, Order, PaymentMethod, ShippingDetails};
use serde::{Deserialize, Serialize};

/// The transport-level acknowledgment for webhook calls. Business outcome is conveyed only through persisted
/// state; the gateway just needs to hear that the delivery landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// A checkout submission from the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub items: Vec<NewLineItem>,
    pub shipping: ShippingDetails,
    #[serde(default)]
    pub shipping_fee: Money,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    /// Must be present and equal to the sum of the line items plus the shipping fee.
    pub total_amount: Option<Money>,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::QrTransfer
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    #[serde(flatten)]
    pub order: Order,
    /// The SePay QR image URL for this order. Absent for cash-on-delivery orders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}
