use std::fmt::Display;

use robux_payment_engine::db_types::{Order, PaymentMethod};
use serde::{Deserialize, Serialize};

/// Body of the order-creation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub robux_amount: u64,
    pub roblox_username: String,
    #[serde(default)]
    pub place_id: Option<u64>,
    #[serde(default)]
    pub crypto_currency: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// What the client needs in order to complete payment, whichever gateway was used.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetails {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    pub payment_details: PaymentDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// Response of the status-check endpoint. `not_found` is a normal state here, not an HTTP error: an unmatched
/// order usually means it expired or was never paid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub order_id: String,
    pub status: String,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robux_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl StatusResponse {
    pub fn bare(order_id: &str, status: &str, status_text: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            status: status.to_string(),
            status_text: status_text.to_string(),
            payment_id: None,
            raw_status: None,
            username: None,
            robux_amount: None,
            paid_amount: None,
            expected_amount: None,
            currency: None,
            pay_address: None,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The crypto aggregator's IPN body. Deliberately loose: only the two fields the reconciler needs are read, and
/// both may be absent in malformed or test notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct NowPaymentsIpn {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

/// The card aggregator's notification envelope. The body's status is never trusted; only `data.id` is used, to
/// re-query the authoritative payment record.
#[derive(Debug, Clone, Deserialize)]
pub struct MpWebhook {
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<MpWebhookData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpWebhookData {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl MpWebhookData {
    /// The aggregator sends payment ids as numbers in some notification types and strings in others.
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}
