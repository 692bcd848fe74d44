use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use pbg_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

// Convenient for constructing `Order` values by hand; the `shipping` column round-trips through this wrapper.
pub use sqlx::types::Json;

//--------------------------------------      OrderRef       ---------------------------------------------------------
/// The human-readable order reference. This is the string a customer puts in their bank transfer memo, so it is
/// deliberately short and alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderRef(pub String);

impl FromStr for OrderRef {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------   PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Bank transfer against a QR code carrying the order reference in the memo.
    QrTransfer,
    /// Cash on delivery. These orders stay `Pending` until the courier settles them.
    CashOnDelivery,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::QrTransfer => write!(f, "QrTransfer"),
            PaymentMethod::CashOnDelivery => write!(f, "CashOnDelivery"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QrTransfer" => Ok(Self::QrTransfer),
            "CashOnDelivery" => Ok(Self::CashOnDelivery),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No settlement has been received for the order.
    Pending,
    /// The order has been settled in full.
    Paid,
    /// The order was abandoned, or settlement did not arrive in time.
    Failed,
    /// The payment was returned after settlement.
    Refunded,
}

impl PaymentStatus {
    /// A terminal status never transitions again under normal operation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------  FulfillmentStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Pending => write!(f, "Pending"),
            FulfillmentStatus::Processing => write!(f, "Processing"),
            FulfillmentStatus::Shipped => write!(f, "Shipped"),
            FulfillmentStatus::Delivered => write!(f, "Delivered"),
            FulfillmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid fulfillment status: {s}"))),
        }
    }
}

//--------------------------------------  ShippingDetails    ---------------------------------------------------------
/// Free-form delivery contact details, stored against the order as a JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub recipient: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

//--------------------------------------      LineItem       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_ref: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl NewLineItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_ref: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl LineItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub reference: OrderRef,
    pub customer_id: Option<String>,
    pub shipping: Json<ShippingDetails>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub gateway_txn_id: Option<String>,
    pub gateway_name: Option<String>,
    pub transfer_amount: Option<Money>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// The gateway settlement details, present once the order has been paid via bank transfer.
    pub fn settlement(&self) -> Option<SettlementDetails> {
        match (&self.gateway_txn_id, &self.gateway_name, self.transfer_amount, self.settled_at) {
            (Some(txid), Some(gateway), Some(amount), Some(settled_at)) => Some(SettlementDetails {
                gateway_txn_id: txid.clone(),
                gateway_name: gateway.clone(),
                transfer_amount: amount,
                settled_at,
            }),
            _ => None,
        }
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The order reference, as assigned by the server at checkout
    pub reference: OrderRef,
    /// The payer's identity, if known. Guest checkouts leave this empty
    pub customer_id: Option<String>,
    /// The goods being bought. Immutable after creation
    pub items: Vec<NewLineItem>,
    /// Delivery contact details
    pub shipping: ShippingDetails,
    /// The delivery fee included in `total_amount`
    pub shipping_fee: Money,
    pub payment_method: PaymentMethod,
    /// The total price of the order. Must equal the sum of the line items plus the shipping fee
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(reference: OrderRef, items: Vec<NewLineItem>, shipping: ShippingDetails, total_amount: Money) -> Self {
        Self {
            reference,
            customer_id: None,
            items,
            shipping,
            shipping_fee: Money::default(),
            payment_method: PaymentMethod::QrTransfer,
            total_amount,
            created_at: Utc::now(),
        }
    }

    pub fn with_customer_id(mut self, customer_id: String) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_shipping_fee(mut self, fee: Money) -> Self {
        self.shipping_fee = fee;
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    /// The sum of line-item subtotals plus the shipping fee.
    pub fn calculated_total(&self) -> Money {
        self.items.iter().map(NewLineItem::subtotal).sum::<Money>() + self.shipping_fee
    }
}

impl Display for NewOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order {} ({} items, {})", self.reference, self.items.len(), self.total_amount)
    }
}

//--------------------------------------  SettlementDetails  ---------------------------------------------------------
/// Gateway metadata recorded against an order when it is marked as paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDetails {
    pub gateway_txn_id: String,
    pub gateway_name: String,
    pub transfer_amount: Money,
    pub settled_at: DateTime<Utc>,
}

//-------------------------------------- TransferDirection   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    In,
    Out,
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::In => write!(f, "in"),
            TransferDirection::Out => write!(f, "out"),
        }
    }
}

impl FromStr for TransferDirection {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            s => Err(ConversionError(format!("Invalid transfer direction: {s}"))),
        }
    }
}

//-------------------------------------- TransferNotification ---------------------------------------------------------
/// A bank transfer event as reported by the payment gateway, after conversion from the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferNotification {
    /// The gateway's identifier for the transfer, if it supplied one
    pub gateway_txn_id: Option<String>,
    /// The name of the bank or gateway that observed the transfer
    pub gateway: String,
    /// The merchant account the transfer landed on
    pub account_number: String,
    /// When the transfer settled at the bank
    pub transferred_at: DateTime<Utc>,
    /// The free-text transfer memo. The order reference is buried in here
    pub content: String,
    pub direction: TransferDirection,
    pub amount: Money,
    /// The gateway's own reference code for the transfer
    pub reference_code: Option<String>,
    /// The webhook body as received, kept for the audit log
    pub raw_payload: String,
}

//-------------------------------------- TransactionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Success => write!(f, "Success"),
            TransactionStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//--------------------------------------    Transaction      ---------------------------------------------------------
/// One row of the append-only webhook audit log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub gateway_txn_id: Option<String>,
    pub order_reference: Option<OrderRef>,
    pub amount: Money,
    pub raw_payload: String,
    pub source_ip: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub gateway_txn_id: Option<String>,
    pub order_reference: Option<OrderRef>,
    pub amount: Money,
    pub raw_payload: String,
    pub source_ip: Option<String>,
    pub status: TransactionStatus,
}

impl NewTransaction {
    pub fn failed(raw_payload: String, amount: Money, source_ip: Option<String>) -> Self {
        Self { gateway_txn_id: None, order_reference: None, amount, raw_payload, source_ip, status: TransactionStatus::Failed }
    }

    pub fn with_gateway_txn_id(mut self, txid: Option<String>) -> Self {
        self.gateway_txn_id = txid;
        self
    }

    pub fn with_order_reference(mut self, reference: OrderRef) -> Self {
        self.order_reference = Some(reference);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }
}
