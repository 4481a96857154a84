//! Provider status vocabularies and their mapping onto the canonical lifecycle.
//!
//! Every provider invents its own settlement vocabulary. The rules here are deliberately conservative: anything that
//! means "still settling" maps to `Confirming`, anything final-and-successful maps to `Processing` (delivery is about
//! to be dispatched), anything final-and-unsuccessful maps to `Failed`, and *unrecognised* codes map to `Pending` —
//! an unknown provider status must never fail an order speculatively.

use std::fmt::Display;

use crate::db_types::OrderStatusType;

//--------------------------------------  CryptoInvoiceStatus  -------------------------------------------------------
/// Status vocabulary of the crypto-invoice aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoInvoiceStatus {
    Waiting,
    Confirming,
    Confirmed,
    Sending,
    PartiallyPaid,
    Finished,
    Failed,
    Refunded,
    Expired,
    Unknown(String),
}

impl From<&str> for CryptoInvoiceStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "waiting" => Self::Waiting,
            "confirming" => Self::Confirming,
            "confirmed" => Self::Confirmed,
            "sending" => Self::Sending,
            "partially_paid" => Self::PartiallyPaid,
            "finished" => Self::Finished,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            "expired" => Self::Expired,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Display for CryptoInvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::Sending => "sending",
            Self::PartiallyPaid => "partially_paid",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Expired => "expired",
            Self::Unknown(s) => s.as_str(),
        };
        write!(f, "{s}")
    }
}

impl CryptoInvoiceStatus {
    pub fn canonical(&self) -> OrderStatusType {
        match self {
            Self::Waiting | Self::PartiallyPaid => OrderStatusType::Pending,
            Self::Confirming | Self::Sending => OrderStatusType::Confirming,
            Self::Confirmed | Self::Finished => OrderStatusType::Processing,
            Self::Failed | Self::Refunded | Self::Expired => OrderStatusType::Failed,
            Self::Unknown(_) => OrderStatusType::Pending,
        }
    }

    /// Short human-readable description, used by the status-check endpoint.
    pub fn user_facing_text(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting for payment",
            Self::Confirming => "Payment received, confirming on blockchain",
            Self::Confirmed => "Payment confirmed, delivering Robux",
            Self::Sending => "Sending Robux to your account",
            Self::PartiallyPaid => "Partial payment received",
            Self::Finished => "Order completed! Check your Roblox transactions",
            Self::Failed => "Payment failed",
            Self::Refunded => "Payment refunded",
            Self::Expired => "Order expired",
            Self::Unknown(_) => "Processing...",
        }
    }
}

//--------------------------------------   CardPaymentStatus   -------------------------------------------------------
/// Status vocabulary of the card aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardPaymentStatus {
    Pending,
    Approved,
    Authorized,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Unknown(String),
}

impl From<&str> for CardPaymentStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "authorized" => Self::Authorized,
            "in_process" => Self::InProcess,
            "in_mediation" => Self::InMediation,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "charged_back" => Self::ChargedBack,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Display for CardPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Authorized => "authorized",
            Self::InProcess => "in_process",
            Self::InMediation => "in_mediation",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
            Self::Unknown(s) => s.as_str(),
        };
        write!(f, "{s}")
    }
}

impl CardPaymentStatus {
    pub fn canonical(&self) -> OrderStatusType {
        match self {
            Self::Pending => OrderStatusType::Pending,
            Self::Authorized | Self::InProcess | Self::InMediation => OrderStatusType::Confirming,
            Self::Approved => OrderStatusType::Processing,
            Self::Rejected | Self::Cancelled | Self::Refunded | Self::ChargedBack => OrderStatusType::Failed,
            Self::Unknown(_) => OrderStatusType::Pending,
        }
    }
}
