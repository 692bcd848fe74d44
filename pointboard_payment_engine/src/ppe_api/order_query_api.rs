use log::trace;

use crate::{
    db_types::{Order, OrderRef, Transaction},
    ppe_api::order_objects::{FullOrder, OrderStatusSummary},
    traits::{OrderManagement, PaymentGatewayError},
};

/// Read-side API over orders and the webhook audit log.
#[derive(Debug, Clone)]
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError> {
        self.db.order_by_reference(reference).await
    }

    /// Fetches the order and its line items. Returns `OrderNotFound` when the reference is unknown.
    pub async fn full_order(&self, reference: &OrderRef) -> Result<FullOrder, PaymentGatewayError> {
        let order = self
            .db
            .order_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(reference.clone()))?;
        let items = self.db.line_items_for_order(order.id).await?;
        trace!("🔍️ Fetched order [{reference}] with {} line items", items.len());
        Ok(FullOrder { order, items })
    }

    /// The settlement status summary for the client poller. Returns `OrderNotFound` when the reference is unknown.
    pub async fn status_summary(&self, reference: &OrderRef) -> Result<OrderStatusSummary, PaymentGatewayError> {
        let order = self
            .db
            .order_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(reference.clone()))?;
        Ok(OrderStatusSummary::from(&order))
    }

    pub async fn transactions_for_order(&self, reference: &OrderRef) -> Result<Vec<Transaction>, PaymentGatewayError> {
        self.db.transactions_for_order(reference).await
    }

    pub async fn recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, PaymentGatewayError> {
        self.db.recent_transactions(limit).await
    }
}
