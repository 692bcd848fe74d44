use std::fmt::Debug;

use log::*;
use pbg_common::Money;

use crate::{
    db_types::{
        NewOrder,
        NewTransaction,
        Order,
        OrderRef,
        SettlementDetails,
        TransactionStatus,
        TransferDirection,
        TransferNotification,
    },
    events::{EventProducers, OrderPaidEvent},
    helpers::ReferenceFormat,
    traits::{PaymentGatewayDatabase, PaymentGatewayError, SettlementOutcome},
};

/// The business outcome of one inbound webhook call. Whatever the variant, exactly one transaction record has been
/// appended to the audit log by the time this is returned; the HTTP layer acknowledges the gateway with a 200 in
/// every case and the outcome lives only in persisted state.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The order was pending and is now paid.
    Settled(Order),
    /// Idempotent replay of a settlement this system has already applied.
    AlreadySettled(Order),
    /// The order is already settled by a different gateway transaction. Manual reconciliation required.
    Conflict { reference: OrderRef, incoming_txn_id: String },
    /// The transfer amount does not equal the order total; the order stays pending.
    AmountMismatch { reference: OrderRef, expected: Money, actual: Money },
    /// The memo matched the reference pattern, but no such order exists.
    OrderNotFound(OrderRef),
    /// The transfer memo does not contain the reference pattern.
    NoReferenceMatch,
    /// Outbound or otherwise non-incoming transfer; not ours to settle.
    IgnoredOutbound,
    /// The gateway did not supply a transaction id, so the settlement cannot be made idempotent.
    MissingTransactionId,
}

impl IngestOutcome {
    /// A short human-readable summary, used in webhook acknowledgments and logs.
    pub fn message(&self) -> String {
        match self {
            IngestOutcome::Settled(order) => format!("Order {} marked as paid", order.reference),
            IngestOutcome::AlreadySettled(order) => format!("Order {} was already paid", order.reference),
            IngestOutcome::Conflict { reference, .. } => {
                format!("Order {reference} is already settled by a different transaction")
            },
            IngestOutcome::AmountMismatch { reference, expected, actual } => {
                format!("Transfer of {actual} does not match the {expected} total of order {reference}")
            },
            IngestOutcome::OrderNotFound(reference) => format!("No order found for reference {reference}"),
            IngestOutcome::NoReferenceMatch => "No order reference found in transfer content".to_string(),
            IngestOutcome::IgnoredOutbound => "Ignoring non-incoming transfer".to_string(),
            IngestOutcome::MissingTransactionId => "Transfer notification carried no transaction id".to_string(),
        }
    }

    pub fn paid_order(&self) -> Option<&Order> {
        match self {
            IngestOutcome::Settled(order) => Some(order),
            _ => None,
        }
    }
}

/// `OrderFlowApi` is the primary API for handling order and payment flows in response to storefront checkouts and
/// payment gateway webhook events.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    reference_format: ReferenceFormat,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, reference_format: ReferenceFormat::default() }
    }

    pub fn with_reference_format(mut self, format: ReferenceFormat) -> Self {
        self.reference_format = format;
        self
    }

    pub fn reference_format(&self) -> &ReferenceFormat {
        &self.reference_format
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Submit a new order to the order manager.
    ///
    /// This should be a brand-new order with a fresh payment reference. The order spec is validated before anything
    /// is written: the total must be strictly positive, there must be at least one line item, and the total must
    /// equal the sum of the line items plus the shipping fee.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        validate_order(&order)?;
        let order = self.db.insert_order(order).await?;
        debug!("🔄️📦️ Order [{}] processing complete. Awaiting payment of {}.", order.reference, order.total_amount);
        Ok(order)
    }

    /// Runs the webhook ingest pipeline for an incoming transfer notification.
    ///
    /// The pipeline is: filter direction, extract the order reference from the free-text memo, resolve the order,
    /// and apply the settlement. Every path, success or failure, appends exactly one transaction record; the
    /// settlement paths write it in the same database transaction as the order mutation.
    pub async fn process_transfer_notification(
        &self,
        source_ip: Option<String>,
        notification: TransferNotification,
    ) -> Result<IngestOutcome, PaymentGatewayError> {
        let record = NewTransaction {
            gateway_txn_id: notification.gateway_txn_id.clone(),
            order_reference: None,
            amount: notification.amount,
            raw_payload: notification.raw_payload.clone(),
            source_ip,
            status: TransactionStatus::Pending,
        };
        if notification.direction != TransferDirection::In {
            self.db.log_transaction(record.with_status(TransactionStatus::Failed)).await?;
            debug!("🔄️💰️ Ignoring {} transfer from {}", notification.direction, notification.gateway);
            return Ok(IngestOutcome::IgnoredOutbound);
        }
        let Some(reference) = self.reference_format.extract(&notification.content) else {
            self.db.log_transaction(record.with_status(TransactionStatus::Failed)).await?;
            debug!("🔄️💰️ No order reference in transfer content: {}", notification.content);
            return Ok(IngestOutcome::NoReferenceMatch);
        };
        let Some(txn_id) = notification.gateway_txn_id.clone() else {
            self.db
                .log_transaction(record.with_order_reference(reference.clone()).with_status(TransactionStatus::Failed))
                .await?;
            warn!("🔄️💰️ Transfer for [{reference}] carried no transaction id. Cannot settle safely.");
            return Ok(IngestOutcome::MissingTransactionId);
        };
        let details = SettlementDetails {
            gateway_txn_id: txn_id,
            gateway_name: notification.gateway.clone(),
            transfer_amount: notification.amount,
            settled_at: notification.transferred_at,
        };
        let outcome = match self.db.settle_order(&reference, details, record).await? {
            SettlementOutcome::Settled(order) => {
                self.call_order_paid_hook(&order).await;
                IngestOutcome::Settled(order)
            },
            SettlementOutcome::AlreadySettled(order) => IngestOutcome::AlreadySettled(order),
            SettlementOutcome::Conflict { order, incoming_txn_id } => {
                IngestOutcome::Conflict { reference: order.reference, incoming_txn_id }
            },
            SettlementOutcome::AmountMismatch { order, actual } => {
                IngestOutcome::AmountMismatch { reference: order.reference, expected: order.total_amount, actual }
            },
            SettlementOutcome::OrderNotFound(reference) => IngestOutcome::OrderNotFound(reference),
        };
        debug!("🔄️💰️ Transfer processing complete. {}", outcome.message());
        Ok(outcome)
    }

    /// Appends a `Failed` audit record for a webhook call that was rejected before the ingest pipeline ran
    /// (typically: the source address was not on the gateway allow-list).
    pub async fn record_rejected_transfer(
        &self,
        source_ip: Option<String>,
        raw_payload: String,
        amount: Money,
        reason: &str,
    ) -> Result<(), PaymentGatewayError> {
        warn!("🔄️🚫️ Rejected transfer notification: {reason}");
        let record = NewTransaction::failed(raw_payload, amount, source_ip);
        self.db.log_transaction(record).await?;
        Ok(())
    }

    /// Marks pending QR-transfer orders older than `older_than` as failed. The result is the list of orders that
    /// were expired.
    pub async fn expire_old_orders(&self, older_than: chrono::Duration) -> Result<Vec<Order>, PaymentGatewayError> {
        let expired = self.db.expire_stale_orders(older_than).await?;
        if !expired.is_empty() {
            info!("🔄️🕰️ {} stale orders marked as failed", expired.len());
        }
        Ok(expired)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

fn validate_order(order: &NewOrder) -> Result<(), PaymentGatewayError> {
    if !order.total_amount.is_positive() {
        return Err(PaymentGatewayError::InvalidOrder(format!(
            "Order total must be positive, got {}",
            order.total_amount
        )));
    }
    if order.items.is_empty() {
        return Err(PaymentGatewayError::InvalidOrder("Order must contain at least one line item".to_string()));
    }
    let calculated = order.calculated_total();
    if calculated != order.total_amount {
        return Err(PaymentGatewayError::InvalidOrder(format!(
            "Order total {} does not equal line items plus shipping fee ({calculated})",
            order.total_amount
        )));
    }
    Ok(())
}
