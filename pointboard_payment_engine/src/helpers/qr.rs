use std::fmt::Display;

use pbg_common::Money;
use serde::{Deserialize, Serialize};

use crate::{db_types::OrderRef, helpers::ReferenceFormat};

/// A deterministic SePay QR payment descriptor.
///
/// Building one has no side effects: the same `(amount, reference, account, bank)` always produces the same payload,
/// so the storefront, the CLI and the tests all render identical codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayment {
    pub account: String,
    pub bank: String,
    pub amount: Money,
    pub memo: String,
}

impl QrPayment {
    pub fn new(amount: Money, reference: &OrderRef, account: &str, bank: &str, format: &ReferenceFormat) -> Self {
        Self { account: account.to_string(), bank: bank.to_string(), amount, memo: format.memo(reference) }
    }

    /// The SePay QR image URL. The amount is a whole number of đồng; the memo carries the payment reference.
    pub fn to_url(&self) -> String {
        format!(
            "https://qr.sepay.vn/img?acc={}&bank={}&amount={}&des={}",
            self.account,
            self.bank,
            self.amount.value(),
            self.memo
        )
    }
}

impl Display for QrPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}@{} ({})", self.amount, self.account, self.bank, self.memo)
    }
}
