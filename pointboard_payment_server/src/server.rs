use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use pointboard_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderPaidEvent},
    helpers::ReferenceFormat,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    routes::{health, CreateOrderRoute, OrderByReferenceRoute, OrderStatusRoute, RecentTransactionsRoute},
    sepay_routes::SepayWebhookRoute,
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, order_paid_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default order-paid hook: a log line. Fulfilment integrations subscribe here when they grow up.
fn order_paid_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev: OrderPaidEvent| {
        Box::pin(async move {
            info!("🎉️ Order [{}] has been paid ({}). Hand it to fulfilment.", ev.order.reference, ev.order.total_amount);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<actix_web::dev::Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let sepay = config.sepay.clone();
    let bank = config.bank.clone();
    let memo_prefix = config.memo_prefix.clone();
    let srv = HttpServer::new(move || {
        let reference_format = ReferenceFormat::new(&memo_prefix);
        let orders_api =
            OrderFlowApi::new(db.clone(), producers.clone()).with_reference_format(reference_format);
        let query_api = OrderQueryApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pbg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(sepay.clone()))
            .app_data(web::Data::new(bank.clone()));
        let sepay_scope = web::scope("/sepay").service(SepayWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(OrderByReferenceRoute::<SqliteDatabase>::new())
            .service(RecentTransactionsRoute::<SqliteDatabase>::new())
            .service(sepay_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
