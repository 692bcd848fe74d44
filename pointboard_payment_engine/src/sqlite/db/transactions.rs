use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransaction, OrderRef, Transaction},
    traits::PaymentGatewayError,
};

/// Appends one row to the webhook audit log. The log is append-only; there is deliberately no update function in
/// this module.
pub async fn insert(record: NewTransaction, conn: &mut SqliteConnection) -> Result<Transaction, PaymentGatewayError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO transactions (gateway_txn_id, order_reference, amount, raw_payload, source_ip, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(&record.gateway_txn_id)
    .bind(&record.order_reference)
    .bind(record.amount)
    .bind(&record.raw_payload)
    .bind(&record.source_ip)
    .bind(record.status)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch_for_order(
    reference: &OrderRef,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM transactions WHERE order_reference = $1 ORDER BY id ASC")
        .bind(reference.as_str())
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_recent(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM transactions ORDER BY id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
