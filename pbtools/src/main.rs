use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use pbg_common::Money;
use pointboard_payment_engine::{
    db_types::{NewLineItem, OrderRef, PaymentMethod, ShippingDetails},
    helpers::{QrPayment, ReferenceFormat, DEFAULT_MEMO_PREFIX},
};
use pointboard_payment_server::data_objects::NewOrderRequest;
use url::Url;

mod client;
mod poller;
mod qr;

use client::PaymentServerClient;
use poller::PaymentPoller;
use qr::render_qr_code;

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Operator tools for the PointBoard payment gateway")]
pub struct Arguments {
    /// Base URL of the payment server
    #[arg(short, long, default_value = "http://127.0.0.1:4780")]
    server: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "order", about = "Submit a single-item test order and print its payment QR")]
    CreateOrder(CreateOrderParams),
    #[clap(name = "qr", about = "Render the payment QR for an existing order reference")]
    Qr(QrParams),
    #[clap(name = "poll", about = "Poll an order until its payment settles, fails or the ceiling elapses")]
    Poll(PollParams),
}

#[derive(Debug, Args)]
pub struct CreateOrderParams {
    /// Product reference of the single line item
    #[arg(short = 'p', long = "product", default_value = "catan")]
    product: String,
    /// Display name of the line item
    #[arg(short = 'n', long = "name", default_value = "Catan")]
    name: String,
    /// Unit price in đồng
    #[arg(long = "price")]
    price: i64,
    #[arg(short = 'q', long = "quantity", default_value = "1")]
    quantity: i64,
    /// Delivery fee in đồng
    #[arg(long = "shipping-fee", default_value = "0")]
    shipping_fee: i64,
    #[arg(long = "recipient", default_value = "Test Recipient")]
    recipient: String,
    #[arg(long = "phone", default_value = "0900000000")]
    phone: String,
    #[arg(long = "address", default_value = "1 Test Street")]
    address: String,
    /// Customer id, if not a guest checkout
    #[arg(short = 'c', long = "customer")]
    customer: Option<String>,
}

#[derive(Debug, Args)]
pub struct QrParams {
    /// The order reference to encode in the memo
    #[arg(short = 'r', long = "reference")]
    reference: String,
    /// The amount in đồng
    #[arg(short = 'a', long = "amount")]
    amount: i64,
    /// Merchant bank account number
    #[arg(long = "account")]
    account: String,
    /// Bank short code, e.g. MBBank
    #[arg(long = "bank")]
    bank: String,
    /// Memo prefix; must match the server's PBG_MEMO_PREFIX
    #[arg(long = "prefix", default_value = DEFAULT_MEMO_PREFIX)]
    prefix: String,
}

#[derive(Debug, Args)]
pub struct PollParams {
    /// The order reference to watch
    #[arg(short = 'r', long = "reference")]
    reference: String,
    /// The expected amount in đồng. Settlements with any other amount are waited out
    #[arg(short = 'a', long = "amount")]
    amount: i64,
    /// Seconds between status checks
    #[arg(long = "interval", default_value = "2")]
    interval_secs: u64,
    /// Give up after this many seconds
    #[arg(long = "ceiling", default_value = "10800")]
    ceiling_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let server = Url::parse(&args.server)?;
    match args.command {
        Command::CreateOrder(params) => create_order(server, params).await,
        Command::Qr(params) => print_qr(params),
        Command::Poll(params) => poll(server, params).await,
    }
}

async fn create_order(server: Url, params: CreateOrderParams) -> Result<()> {
    let client = PaymentServerClient::new(server);
    let total = Money::from(params.price * params.quantity + params.shipping_fee);
    let request = NewOrderRequest {
        customer_id: params.customer,
        items: vec![NewLineItem {
            product_ref: params.product,
            name: params.name,
            unit_price: Money::from(params.price),
            quantity: params.quantity,
        }],
        shipping: ShippingDetails {
            recipient: params.recipient,
            phone: params.phone,
            address: params.address,
            city: None,
            note: None,
        },
        shipping_fee: Money::from(params.shipping_fee),
        payment_method: PaymentMethod::QrTransfer,
        total_amount: Some(total),
    };
    let created = client.create_order(&request).await?;
    println!("Order created: {} ({})", created.order.reference, created.order.total_amount);
    if let Some(qr_url) = created.qr_url {
        println!("{qr_url}");
        println!("{}", render_qr_code(&qr_url));
    }
    Ok(())
}

fn print_qr(params: QrParams) -> Result<()> {
    let format = ReferenceFormat::new(&params.prefix);
    let reference = OrderRef(params.reference);
    let payment = QrPayment::new(Money::from(params.amount), &reference, &params.account, &params.bank, &format);
    println!("{}", payment.to_url());
    println!("{}", render_qr_code(&payment.to_url()));
    Ok(())
}

async fn poll(server: Url, params: PollParams) -> Result<()> {
    let client = PaymentServerClient::new(server);
    let reference = OrderRef(params.reference);
    let poller = PaymentPoller::new(client, reference.clone(), Money::from(params.amount))
        .with_interval(Duration::from_secs(params.interval_secs))
        .with_ceiling(Duration::from_secs(params.ceiling_secs));
    println!("Waiting for order {reference} to settle...");
    let status = poller.wait_for_settlement().await?;
    println!("Order {reference} is paid ({:?} received)", status.amount_paid);
    Ok(())
}
