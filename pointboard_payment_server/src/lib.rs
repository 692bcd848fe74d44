//! # PointBoard Payment Server
//! This module hosts the HTTP layer of the PointBoard payment gateway. It is responsible for:
//! Listening for incoming webhook requests from the SePay gateway.
//! Authenticating webhook calls by source address and feeding them into the payment engine.
//! Accepting checkout submissions and serving payment status queries to the storefront.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/order`: Checkout submissions and order/status lookups.
//! * `/transactions`: The webhook audit log.
//! * `/sepay/webhook`: The webhook route for receiving transfer notifications from SePay.

pub mod cli;
pub mod config;
pub mod errors;

pub mod data_objects;
pub mod expiry_worker;
pub mod helpers;
pub mod routes;
pub mod sepay_event;
pub mod sepay_routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
