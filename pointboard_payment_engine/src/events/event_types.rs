use crate::db_types::Order;

/// Fired whenever an order transitions to `Paid`. Replayed webhook deliveries do not fire this again.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
