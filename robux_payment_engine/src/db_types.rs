use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rpg_common::Robux;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The canonical order lifecycle. Every payment provider has its own status vocabulary; all of them are mapped onto
/// this one (see [`crate::status_map`]) before any business decision is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order exists and no payment has been confirmed yet.
    Pending,
    /// The provider has seen funds, but they are still settling.
    Confirming,
    /// Payment is final and delivery has been claimed. The dispatch call is in flight or about to be.
    Processing,
    /// Delivery succeeded. Terminal.
    Completed,
    /// Payment failed, expired, or was refunded; or delivery was rejected. Terminal.
    Failed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Failed)
    }

    /// Whether a transition from `self` to `next` moves the lifecycle forward. Orders only ever move forward;
    /// a late or replayed webhook reporting an earlier state must not rewind the record.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (self, next) {
            (Pending, Confirming | Processing | Failed) => true,
            (Confirming, Processing | Failed) => true,
            (Processing, Completed | Failed) => true,
            _ => false,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "PENDING"),
            OrderStatusType::Confirming => write!(f, "CONFIRMING"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Completed => write!(f, "COMPLETED"),
            OrderStatusType::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMING" => Ok(Self::Confirming),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Crypto-invoice aggregator (NOWPayments-compatible).
    Crypto,
    /// Card/transfer aggregator settling in local currency (Mercado Pago-compatible).
    Mercadopago,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::Crypto
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Crypto => write!(f, "crypto"),
            PaymentMethod::Mercadopago => write!(f, "mercadopago"),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// A logical order. In the stateless deployment nothing persists this struct; it is materialised at order-creation
/// time for the response body, and reconstructed on demand from the identifier token plus the provider's own ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// The compound identifier token. See [`crate::order_id`].
    pub id: String,
    pub roblox_username: String,
    /// The quantity the purchaser will own after the vendor's take-rate is deducted downstream.
    pub robux_amount_net: Robux,
    /// The larger quantity actually transacted with the fulfilment vendor.
    pub robux_amount_gross: Robux,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<u64>,
    pub usd_price: f64,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_currency: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}
