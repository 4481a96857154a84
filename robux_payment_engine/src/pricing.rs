//! Pricing: fee pass-through and fiat quoting.
//!
//! The fulfilment vendor deducts a 30% take-rate from every purchase, so to hand the customer `net` Robux the
//! storefront must transact `gross = ceil(net / 0.7)` with the vendor. Rounding is always *up*: undershooting the
//! gross amount would short-change the customer, overshooting costs at most a rounding unit.
//!
//! The fiat price is charged on the *net* (received) amount at a flat unit price per 1000 Robux.

use rpg_common::{round2, Robux};
use serde::Serialize;
use thiserror::Error;

/// Vendor take-rate, as a fraction of the gross amount.
pub const FEE_RATE: f64 = 0.30;
/// USD charged per 1000 net Robux.
pub const UNIT_PRICE_USD: f64 = 6.50;
/// Smallest order the storefront accepts.
pub const MIN_ORDER_ROBUX: u64 = 100;
/// Largest order the storefront accepts. Also keeps the gross computation comfortably inside u64.
pub const MAX_ORDER_ROBUX: u64 = 10_000_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Invalid amount: {0}. Orders must be between {MIN_ORDER_ROBUX} and {MAX_ORDER_ROBUX} Robux")]
    InvalidAmount(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub net_amount: Robux,
    pub gross_amount: Robux,
    pub usd_price: f64,
}

/// Compute the gross amount and fiat price for a desired net amount.
pub fn quote(net_amount: u64) -> Result<Quote, PricingError> {
    if !(MIN_ORDER_ROBUX..=MAX_ORDER_ROBUX).contains(&net_amount) {
        return Err(PricingError::InvalidAmount(net_amount));
    }
    // ceil(net / 0.7) == ceil(10 * net / 7), computed in integer arithmetic to avoid float edge cases.
    let gross = (net_amount * 10).div_ceil(7);
    let usd_price = round2(net_amount as f64 / 1000.0 * UNIT_PRICE_USD);
    Ok(Quote { net_amount: Robux::from(net_amount), gross_amount: Robux::from(gross), usd_price })
}

/// Convert a USD price into the settlement currency at the given exchange rate.
pub fn convert(usd_price: f64, rate: f64) -> f64 {
    round2(usd_price * rate)
}
