use crate::{
    db_types::{LineItem, Order, OrderRef, Transaction},
    traits::PaymentGatewayError,
};

/// Read-side queries over orders and the webhook audit log.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError>;

    async fn line_items_for_order(&self, order_id: i64) -> Result<Vec<LineItem>, PaymentGatewayError>;

    /// All audit records whose parsed reference matched this order, oldest first.
    async fn transactions_for_order(&self, reference: &OrderRef) -> Result<Vec<Transaction>, PaymentGatewayError>;

    /// The most recent audit records, newest first.
    async fn recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, PaymentGatewayError>;
}
