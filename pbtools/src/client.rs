use anyhow::{anyhow, Result};
use log::debug;
use pointboard_payment_engine::{db_types::OrderRef, order_objects::OrderStatusSummary};
use pointboard_payment_server::data_objects::{NewOrderRequest, OrderCreatedResponse};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::poller::{PollError, StatusSource};

/// A thin HTTP client for the PointBoard payment server.
pub struct PaymentServerClient {
    client: Client,
    base_url: Url,
}

impl PaymentServerClient {
    pub fn new(base_url: Url) -> Self {
        Self { client: Client::new(), base_url }
    }

    pub async fn create_order(&self, order: &NewOrderRequest) -> Result<OrderCreatedResponse> {
        let url = self.base_url.join("/order")?;
        debug!("POST {url}");
        let res = self.client.post(url).json(order).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Server rejected the order: {status} {body}"));
        }
        Ok(res.json().await?)
    }

    pub async fn order_status(&self, reference: &OrderRef) -> Result<OrderStatusSummary, PollError> {
        let url = self
            .base_url
            .join(&format!("/order/{reference}/status"))
            .map_err(|e| PollError::Transport(e.to_string()))?;
        debug!("GET {url}");
        let res = self.client.get(url).send().await.map_err(|e| PollError::Transport(e.to_string()))?;
        if res.status() == StatusCode::NOT_FOUND {
            return Err(PollError::UnknownOrder(reference.clone()));
        }
        if !res.status().is_success() {
            return Err(PollError::Transport(format!("server answered with {}", res.status())));
        }
        res.json().await.map_err(|e| PollError::Transport(e.to_string()))
    }
}

impl StatusSource for PaymentServerClient {
    async fn fetch_status(&self, reference: &OrderRef) -> Result<OrderStatusSummary, PollError> {
        self.order_status(reference).await
    }
}
