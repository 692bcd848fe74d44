//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get executed
//! concurrently by worker threads and thus don't block execution.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use pointboard_payment_engine::{
    db_types::{NewOrder, OrderRef, PaymentMethod},
    helpers::{new_order_reference, QrPayment},
    traits::{OrderManagement, PaymentGatewayDatabase},
    OrderFlowApi,
    OrderQueryApi,
};

use crate::{
    config::BankConfig,
    data_objects::{NewOrderRequest, OrderCreatedResponse, TransactionsQuery},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/order" impl PaymentGatewayDatabase);
/// Route handler for checkout submissions.
///
/// The server assigns the payment reference; clients never pick their own. The response is the stored order plus,
/// for QR-transfer orders, the payment QR URL the storefront renders at checkout.
pub async fn create_order<B: PaymentGatewayDatabase>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    bank: web::Data<BankConfig>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST create_order with {} line items", request.items.len());
    let total_amount =
        request.total_amount.ok_or_else(|| ServerError::OrderValidationError("totalAmount is required".to_string()))?;
    let mut order = NewOrder::new(new_order_reference(), request.items, request.shipping, total_amount)
        .with_shipping_fee(request.shipping_fee)
        .with_payment_method(request.payment_method);
    if let Some(customer_id) = request.customer_id {
        order = order.with_customer_id(customer_id);
    }
    let order = api.process_new_order(order).await?;
    info!("💻️ Order [{}] created. Awaiting {} payment.", order.reference, order.payment_method);
    let qr_url = (order.payment_method == PaymentMethod::QrTransfer).then(|| {
        QrPayment::new(order.total_amount, &order.reference, &bank.account, &bank.code, api.reference_format()).to_url()
    });
    Ok(HttpResponse::Ok().json(OrderCreatedResponse { order, qr_url }))
}

route!(order_by_reference => Get "/order/{reference}" impl OrderManagement);
pub async fn order_by_reference<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let reference = OrderRef(path.into_inner());
    debug!("💻️ GET order [{reference}]");
    let order = api.full_order(&reference).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_status => Get "/order/{reference}/status" impl OrderManagement);
/// The payment status summary the storefront polls during checkout.
pub async fn order_status<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let reference = OrderRef(path.into_inner());
    trace!("💻️ GET order status [{reference}]");
    let summary = api.status_summary(&reference).await?;
    Ok(HttpResponse::Ok().json(summary))
}

//----------------------------------------------   Audit  ----------------------------------------------------
const DEFAULT_TRANSACTION_LIMIT: i64 = 50;

route!(recent_transactions => Get "/transactions" impl OrderManagement);
pub async fn recent_transactions<B: OrderManagement>(
    query: web::Query<TransactionsQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT).clamp(1, 500);
    debug!("💻️ GET recent transactions (limit {limit})");
    let records = api.recent_transactions(limit).await?;
    Ok(HttpResponse::Ok().json(records))
}
