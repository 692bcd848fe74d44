mod money;

pub mod op;
mod secret;

mod helpers;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, VND_CURRENCY_CODE, VND_CURRENCY_CODE_LOWER};
pub use secret::Secret;
