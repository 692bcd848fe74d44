use std::fmt::Debug;

use chrono::Duration;
use log::{debug, info, trace, warn};
use sqlx::SqlitePool;

use crate::{
    db_types::{
        LineItem,
        NewOrder,
        NewTransaction,
        Order,
        OrderRef,
        PaymentStatus,
        SettlementDetails,
        Transaction,
        TransactionStatus,
    },
    sqlite::{db::{orders, transactions}, db_url, new_pool},
    traits::{OrderManagement, PaymentGatewayDatabase, PaymentGatewayError, SettlementOutcome},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] has been saved in the DB with id {}", order.reference, order.id);
        Ok(order)
    }

    async fn fetch_order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn settle_order(
        &self,
        reference: &OrderRef,
        details: SettlementDetails,
        record: NewTransaction,
    ) -> Result<SettlementOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let record = record.with_order_reference(reference.clone());
        let order = orders::fetch_order_by_reference(reference, &mut tx).await?;
        let outcome = match order {
            None => {
                transactions::insert(record.with_status(TransactionStatus::Failed), &mut tx).await?;
                debug!("🗃️ No order found for reference [{reference}]. Transfer logged as failed.");
                SettlementOutcome::OrderNotFound(reference.clone())
            },
            Some(order) if order.payment_status == PaymentStatus::Paid => {
                if order.gateway_txn_id.as_deref() == Some(details.gateway_txn_id.as_str()) {
                    transactions::insert(record.with_status(TransactionStatus::Success), &mut tx).await?;
                    debug!(
                        "🗃️ Order [{reference}] already settled by transaction {}. Replay is a no-op.",
                        details.gateway_txn_id
                    );
                    SettlementOutcome::AlreadySettled(order)
                } else {
                    transactions::insert(record.with_status(TransactionStatus::Failed), &mut tx).await?;
                    warn!(
                        "🗃️ Order [{reference}] is already settled by transaction {:?}, but transaction {} also \
                         claims it. Flagging for manual review.",
                        order.gateway_txn_id, details.gateway_txn_id
                    );
                    SettlementOutcome::Conflict { order, incoming_txn_id: details.gateway_txn_id }
                }
            },
            Some(order) if order.payment_status.is_terminal() => {
                // Failed or Refunded. A transfer arriving now needs a human.
                transactions::insert(record.with_status(TransactionStatus::Failed), &mut tx).await?;
                warn!(
                    "🗃️ Transfer {} arrived for order [{reference}] which is {}. Flagging for manual review.",
                    details.gateway_txn_id, order.payment_status
                );
                SettlementOutcome::Conflict { order, incoming_txn_id: details.gateway_txn_id }
            },
            Some(order) if order.total_amount != details.transfer_amount => {
                transactions::insert(record.with_status(TransactionStatus::Failed), &mut tx).await?;
                debug!(
                    "🗃️ Transfer of {} does not match the {} total of order [{reference}]. Order left pending.",
                    details.transfer_amount, order.total_amount
                );
                SettlementOutcome::AmountMismatch { order, actual: details.transfer_amount }
            },
            Some(order) => {
                let updated = orders::mark_paid(order.id, &details, &mut tx).await?;
                transactions::insert(record.with_status(TransactionStatus::Success), &mut tx).await?;
                info!(
                    "🗃️ Order [{reference}] settled by {} transaction {} for {}.",
                    details.gateway_name, details.gateway_txn_id, details.transfer_amount
                );
                SettlementOutcome::Settled(updated)
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn log_transaction(&self, record: NewTransaction) -> Result<Transaction, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::insert(record, &mut conn).await?;
        trace!("🗃️ Transaction record #{} appended to the audit log.", row.id);
        Ok(row)
    }

    async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let expired = orders::expire_stale(older_than, &mut tx).await?;
        tx.commit().await?;
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn line_items_for_order(&self, order_id: i64) -> Result<Vec<LineItem>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_line_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn transactions_for_order(&self, reference: &OrderRef) -> Result<Vec<Transaction>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let rows = transactions::fetch_for_order(reference, &mut conn).await?;
        Ok(rows)
    }

    async fn recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let rows = transactions::fetch_recent(limit, &mut conn).await?;
        Ok(rows)
    }
}
