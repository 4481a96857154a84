mod robux;

pub mod op;
mod secret;

mod helpers;

pub use helpers::{parse_boolean_flag, round2};
pub use robux::{Robux, RobuxConversionError, ROBUX_CURRENCY_CODE};
pub use secret::Secret;
