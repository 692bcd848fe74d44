//----------------------------------------------   SePay webhook  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error, info, trace, warn};
use pbg_common::Money;
use pointboard_payment_engine::{traits::PaymentGatewayDatabase, OrderFlowApi};

use crate::{
    config::{SePayConfig, ServerOptions},
    data_objects::JsonResponse,
    helpers::get_remote_ip,
    route,
    sepay_event::{transfer_notification_from_event, SePayEvent},
};

route!(sepay_webhook => Post "/webhook" impl PaymentGatewayDatabase);
/// The SePay transfer notification endpoint.
///
/// Every call is acknowledged with a 200, whatever happens inside: the gateway retries anything it considers
/// undelivered, and a retry storm of unprocessable payloads helps nobody. The business outcome is conveyed only
/// through persisted state; every call leaves exactly one row in the transaction log.
///
/// The body is taken as a raw string rather than `web::Json` so that unauthenticated or malformed deliveries can
/// still be logged and acknowledged instead of bouncing with a 400 before the handler runs.
pub async fn sepay_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: String,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
    sepay: web::Data<SePayConfig>,
) -> HttpResponse {
    trace!("🏦️ Received webhook request: {}", req.uri());
    let ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let source_ip = ip.map(|i| i.to_string());
    let event = serde_json::from_str::<SePayEvent>(&body).ok();

    if !sepay.authorizes(ip) {
        let amount = event.and_then(|e| Money::try_from(e.transfer_amount).ok()).unwrap_or_default();
        let reason = format!("source address {source_ip:?} is not on the SePay allow-list");
        if let Err(e) = api.record_rejected_transfer(source_ip, body, amount, &reason).await {
            error!("🏦️ Could not record rejected transfer. {e}");
        }
        return acknowledge("Notification received");
    }

    let Some(event) = event else {
        warn!("🏦️ Could not deserialize webhook payload");
        if let Err(e) = api.record_rejected_transfer(source_ip, body, Money::default(), "unparseable payload").await {
            error!("🏦️ Could not record unparseable transfer. {e}");
        }
        return acknowledge("Notification received");
    };

    let notification = match transfer_notification_from_event(event, body.clone()) {
        Ok(notification) => notification,
        Err(e) => {
            warn!("🏦️ Could not convert webhook payload. {e}");
            if let Err(e2) = api.record_rejected_transfer(source_ip, body, Money::default(), &e.to_string()).await {
                error!("🏦️ Could not record unconvertible transfer. {e2}");
            }
            return acknowledge("Notification received");
        },
    };

    let amount = notification.amount;
    match api.process_transfer_notification(source_ip.clone(), notification).await {
        Ok(outcome) => {
            if let Some(order) = outcome.paid_order() {
                info!("🏦️ Order [{}] settled by webhook notification.", order.reference);
            } else {
                debug!("🏦️ Webhook processed without settlement: {}", outcome.message());
            }
            acknowledge(outcome.message())
        },
        Err(e) => {
            error!("🏦️ Unexpected error while handling transfer notification. {e}");
            // Best-effort audit record so the call is still traceable, then acknowledge anyway.
            if let Err(e2) = api.record_rejected_transfer(source_ip, body, amount, &e.to_string()).await {
                error!("🏦️ Could not record failed transfer. {e2}");
            }
            acknowledge("Notification received")
        },
    }
}

fn acknowledge<S: std::fmt::Display>(message: S) -> HttpResponse {
    HttpResponse::Ok().json(JsonResponse::success(message))
}
