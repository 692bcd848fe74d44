//! PointBoard Payment Engine
//!
//! The PointBoard Payment Engine is the core of the storefront's bank-transfer payment gateway. This library contains
//! the order and settlement logic. It is HTTP-framework agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@traits`] and the SQLite backend). You should never need to access the
//!    database directly. Instead, use the public API provided by the payment engine. The exception is the data types
//!    used in the database. These are defined in the `db_types` module and are public.
//! 2. The payment engine public API ([`OrderFlowApi`] and [`OrderQueryApi`]). This provides the public-facing
//!    functionality of the engine: accepting orders, ingesting gateway webhook notifications, settling payments, and
//!    serving status queries. Specific backends need to implement the traits in [`mod@traits`] in order to act as a
//!    backend for the PointBoard Payment Server.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the payment engine. For example, when an order is settled, an `OrderPaidEvent` is emitted. A simple
//! actor framework is used so that you can easily hook into these events and perform custom actions.
pub mod db_types;
pub mod events;
pub mod helpers;
mod ppe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use ppe_api::{order_objects, IngestOutcome, OrderFlowApi, OrderQueryApi};
