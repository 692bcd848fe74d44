use chrono::Duration;
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderRef, SettlementDetails},
    traits::PaymentGatewayError,
};

/// Inserts a new order and its line items using the given connection. This is not atomic on its own. Embed the call
/// inside a transaction and pass `&mut *tx` as the connection argument to get atomicity.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                reference,
                customer_id,
                shipping,
                total_amount,
                payment_method,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(&order.reference)
    .bind(&order.customer_id)
    .bind(Json(order.shipping.clone()))
    .bind(order.total_amount)
    .bind(order.payment_method)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await;
    let row = match result {
        Ok(row) => row,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(PaymentGatewayError::OrderAlreadyExists(order.reference))
        },
        Err(e) => return Err(e.into()),
    };
    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_ref, name, unit_price, quantity) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.id)
        .bind(&item.product_ref)
        .bind(&item.name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order [{}] inserted with id {} and {} line items", row.reference, row.id, order.items.len());
    Ok(row)
}

/// Returns the order with the given payment reference, if any.
pub async fn fetch_order_by_reference(
    reference: &OrderRef,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE reference = $1")
        .bind(reference.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Flips the order to `Paid` and records the gateway settlement details.
pub(crate) async fn mark_paid(
    id: i64,
    details: &SettlementDetails,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentGatewayError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = 'Paid',
                gateway_txn_id = $1,
                gateway_name = $2,
                transfer_amount = $3,
                settled_at = $4,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            RETURNING *;
        "#,
    )
    .bind(&details.gateway_txn_id)
    .bind(&details.gateway_name)
    .bind(details.transfer_amount)
    .bind(details.settled_at)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(PaymentGatewayError::OrderIdNotFound(id))
}

/// Marks pending QR-transfer orders created more than `older_than` ago as `Failed`.
pub(crate) async fn expire_stale(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, PaymentGatewayError> {
    let rows = sqlx::query_as(
        format!(
            "UPDATE orders SET updated_at = CURRENT_TIMESTAMP, payment_status = 'Failed' WHERE payment_status = \
             'Pending' AND payment_method = 'QrTransfer' AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(created_at)) \
             > {} RETURNING *;",
            older_than.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
