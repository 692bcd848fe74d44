mod qr;
mod reference;

pub use qr::QrPayment;
pub use reference::{new_order_reference, ReferenceFormat, DEFAULT_MEMO_PREFIX};
