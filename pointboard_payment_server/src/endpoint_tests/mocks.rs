use chrono::Duration;
use mockall::mock;
use pointboard_payment_engine::{
    db_types::{LineItem, NewOrder, NewTransaction, Order, OrderRef, SettlementDetails, Transaction},
    traits::{OrderManagement, PaymentGatewayDatabase, PaymentGatewayError, SettlementOutcome},
};

mock! {
    pub PaymentGateway {}
    impl Clone for PaymentGateway {
        fn clone(&self) -> Self;
    }
    impl PaymentGatewayDatabase for PaymentGateway {
        fn url(&self) -> &'static str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;
        async fn fetch_order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError>;
        async fn settle_order(
            &self,
            reference: &OrderRef,
            details: SettlementDetails,
            record: NewTransaction,
        ) -> Result<SettlementOutcome, PaymentGatewayError>;
        async fn log_transaction(&self, record: NewTransaction) -> Result<Transaction, PaymentGatewayError>;
        async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, PaymentGatewayError>;
    }
}

mock! {
    pub OrderManager {}
    impl Clone for OrderManager {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderManager {
        async fn order_by_reference(&self, reference: &OrderRef) -> Result<Option<Order>, PaymentGatewayError>;
        async fn line_items_for_order(&self, order_id: i64) -> Result<Vec<LineItem>, PaymentGatewayError>;
        async fn transactions_for_order(&self, reference: &OrderRef) -> Result<Vec<Transaction>, PaymentGatewayError>;
        async fn recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, PaymentGatewayError>;
    }
}
