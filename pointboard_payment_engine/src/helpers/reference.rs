use rand::Rng;
use regex::Regex;

use crate::db_types::OrderRef;

pub const DEFAULT_MEMO_PREFIX: &str = "PointBoard";

/// The character set for generated order references. Ambiguous glyphs (0/O, 1/I) are left out because customers
/// retype these from bank statements.
const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERENCE_LEN: usize = 8;

/// Generates a fresh order reference: `PB` followed by [`REFERENCE_LEN`] characters from [`REFERENCE_CHARSET`].
pub fn new_order_reference() -> OrderRef {
    let mut rng = rand::thread_rng();
    let code: String =
        (0..REFERENCE_LEN).map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char).collect();
    OrderRef(format!("PB{code}"))
}

/// The payment reference format: one struct owns both sides of the memo contract, so the string embedded in QR
/// payloads and the pattern used to extract references from webhook content can never drift apart.
#[derive(Debug, Clone)]
pub struct ReferenceFormat {
    prefix: String,
    pattern: Regex,
}

impl Default for ReferenceFormat {
    fn default() -> Self {
        Self::new(DEFAULT_MEMO_PREFIX)
    }
}

impl ReferenceFormat {
    /// Creates a format with the given literal memo prefix. The extraction pattern is the prefix, an optional single
    /// dash (banks are inconsistent about preserving it), then the alphanumeric reference code, case-insensitively.
    pub fn new(prefix: &str) -> Self {
        let pattern = Regex::new(&format!(r"(?i){}-?([A-Za-z0-9]+)", regex::escape(prefix)))
            .unwrap_or_else(|e| panic!("Invalid memo prefix {prefix}: {e}"));
        Self { prefix: prefix.to_string(), pattern }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Formats the memo string that goes into QR payloads, e.g. `PointBoard-PBQX7K2M4N`.
    pub fn memo(&self, reference: &OrderRef) -> String {
        format!("{}-{}", self.prefix, reference)
    }

    /// Scans free-text transfer content for the memo pattern and extracts the order reference.
    ///
    /// The extracted code is uppercased, since references are generated uppercase and banks mangle case freely.
    pub fn extract(&self, content: &str) -> Option<OrderRef> {
        self.pattern
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| OrderRef(m.as_str().to_uppercase()))
    }
}
