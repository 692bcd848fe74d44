use pbg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{LineItem, Order, PaymentStatus};

/// An order together with its line items, as returned by the order lookup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<LineItem>,
}

/// The payment status summary the client poller consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusSummary {
    pub reference: String,
    #[serde(rename = "paymentState")]
    pub payment_status: PaymentStatus,
    /// True iff the order has been settled.
    pub payment_verified: bool,
    /// The amount actually transferred, once settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<Money>,
}

impl From<&Order> for OrderStatusSummary {
    fn from(order: &Order) -> Self {
        Self {
            reference: order.reference.as_str().to_string(),
            payment_status: order.payment_status,
            payment_verified: order.is_paid(),
            amount_paid: order.transfer_amount,
        }
    }
}
