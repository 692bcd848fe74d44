use chrono::{NaiveDateTime, TimeZone, Utc};
use pbg_common::Money;
use pointboard_payment_engine::db_types::{TransferDirection, TransferNotification};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A SePay webhook payload, as posted by the gateway when a transfer hits the merchant account.
///
/// SePay timestamps are naive local strings (`2024-05-25 21:11:02`); they are treated as UTC here since the gateway
/// does not disclose an offset and the value is only stored, never compared against local clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SePayEvent {
    /// SePay's row id for the transfer
    pub id: i64,
    /// The bank that observed the transfer, e.g. "MBBank"
    pub gateway: String,
    pub transaction_date: String,
    pub account_number: String,
    /// The free-text transfer memo
    pub content: String,
    /// "in" for inbound transfers, "out" for outbound
    pub transfer_type: String,
    pub transfer_amount: f64,
    #[serde(default)]
    pub reference_code: Option<String>,
}

#[derive(Debug, Error)]
pub enum EventConversionError {
    #[error("Could not parse the transaction date '{0}'")]
    BadTimestamp(String),
    #[error("Unknown transfer type '{0}'")]
    BadTransferType(String),
    #[error("Could not convert the transfer amount. {0}")]
    BadAmount(String),
}

/// Converts the wire-format event into the engine's domain notification. `raw_payload` is the body as received,
/// which travels along for the audit log.
pub fn transfer_notification_from_event(
    event: SePayEvent,
    raw_payload: String,
) -> Result<TransferNotification, EventConversionError> {
    let transferred_at = NaiveDateTime::parse_from_str(&event.transaction_date, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| EventConversionError::BadTimestamp(event.transaction_date.clone()))?;
    let direction = event
        .transfer_type
        .parse::<TransferDirection>()
        .map_err(|_| EventConversionError::BadTransferType(event.transfer_type.clone()))?;
    let amount = Money::try_from(event.transfer_amount).map_err(|e| EventConversionError::BadAmount(e.to_string()))?;
    Ok(TransferNotification {
        gateway_txn_id: Some(event.id.to_string()),
        gateway: event.gateway,
        account_number: event.account_number,
        transferred_at,
        content: event.content,
        direction,
        amount,
        reference_code: event.reference_code,
        raw_payload,
    })
}
