use chrono::Duration;
use pbg_common::Money;
use thiserror::Error;

use crate::db_types::{NewOrder, NewTransaction, Order, OrderRef, SettlementDetails, Transaction};

/// The result of applying a transfer to an order inside [`PaymentGatewayDatabase::settle_order`].
///
/// Whatever the variant, the backend has already written the transaction record for the call by the time this is
/// returned; callers never need a follow-up `log_transaction`.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// The order was pending and the amounts matched. It is now `Paid`.
    Settled(Order),
    /// The order was already paid by the same gateway transaction. Nothing was mutated.
    AlreadySettled(Order),
    /// The order was already paid by a *different* gateway transaction. Nothing was mutated;
    /// this needs manual reconciliation.
    Conflict { order: Order, incoming_txn_id: String },
    /// The transfer amount does not equal the order total. The order stays pending.
    AmountMismatch { order: Order, actual: Money },
    /// No order exists for the extracted reference.
    OrderNotFound(OrderRef),
}

/// This trait defines the highest level of behaviour for backends supporting the payment engine.
///
/// This behaviour includes:
/// * Storing incoming orders with a unique payment reference.
/// * Settling orders against bank transfer notifications, atomically with the audit record.
/// * Maintaining the append-only webhook transaction log.
/// * Expiring stale unpaid orders.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order. The payment reference must be unique; a collision returns
    /// [`PaymentGatewayError::OrderAlreadyExists`]. Line items are stored in the same database transaction as the
    /// order row.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    /// Fetches the order with the given payment reference, if it exists.
    async fn fetch_order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError>;

    /// Applies a transfer to the order with the given reference, and appends the matching transaction record, in a
    /// single database transaction.
    ///
    /// The settlement is idempotent: if the order is already `Paid` and the stored gateway transaction id equals
    /// `details.gateway_txn_id`, nothing is mutated (in particular `settled_at` keeps its original value) and
    /// [`SettlementOutcome::AlreadySettled`] is returned with a `Success` audit record. A repeated settlement with a
    /// *different* transaction id mutates nothing and returns [`SettlementOutcome::Conflict`] with a `Failed` audit
    /// record; resolving it is a manual job.
    ///
    /// `record` carries the raw payload and source address for the audit row; its reference and status fields are
    /// finalised by this call according to the outcome.
    async fn settle_order(
        &self,
        reference: &OrderRef,
        details: SettlementDetails,
        record: NewTransaction,
    ) -> Result<SettlementOutcome, PaymentGatewayError>;

    /// Appends a transaction record for a webhook call that never reached settlement (unauthenticated source,
    /// outbound transfer, unparseable memo, and so on).
    async fn log_transaction(&self, record: NewTransaction) -> Result<Transaction, PaymentGatewayError>;

    /// Marks pending QR-transfer orders that have not been updated for longer than `older_than` as `Failed`.
    /// Returns the orders that were expired. Cash-on-delivery orders are never expired here; couriers settle those.
    async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with reference {0}")]
    OrderAlreadyExists(OrderRef),
    #[error("The order spec is invalid. {0}")]
    InvalidOrder(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderRef),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("Order {reference} is already settled by transaction {existing_txn_id}; refusing to apply {incoming_txn_id}")]
    SettlementConflict { reference: OrderRef, existing_txn_id: String, incoming_txn_id: String },
    #[error("{0} are not supported yet")]
    UnsupportedAction(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
