pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;

pub use order_flow_api::{IngestOutcome, OrderFlowApi};
pub use order_query_api::OrderQueryApi;
