use rpg_common::Robux;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The provider could not be reached, timed out, or answered with a non-success HTTP status.
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered successfully but the response is unusable (e.g. no deposit address or redirect URL).
    /// A half-formed response is an error even though the HTTP call "succeeded".
    #[error("Payment provider rejected the request: {0}")]
    Rejected(String),
}

/// What a client needs in order to complete payment. Exactly one of `pay_address` (crypto deposit) or
/// `redirect_url` (hosted checkout) is populated, depending on the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// The provider's own reference for this payment.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub pay_amount: f64,
    pub pay_currency: String,
}

#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    /// The minted order identifier, passed to the provider as its external reference.
    pub order_token: String,
    pub usd_amount: f64,
    pub pay_currency: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct PreferenceRequest {
    pub order_token: String,
    pub title: String,
    pub description: String,
    /// Already converted into the aggregator's settlement currency.
    pub unit_price_local: f64,
    pub roblox_username: String,
    pub robux_amount: Robux,
    pub place_id: Option<u64>,
    pub usd_price: f64,
    pub exchange_rate: f64,
}

/// A payment as recorded in the crypto provider's own ledger. In the stateless deployment this ledger is the only
/// persistent record of in-flight orders.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub payment_id: String,
    /// Raw provider status string; map it with [`crate::status_map::CryptoInvoiceStatus`].
    pub status: String,
    pub pay_address: String,
    pub pay_amount: f64,
    pub actually_paid: f64,
    pub pay_currency: String,
    pub order_token: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A payment as reported by the card aggregator's authoritative status API.
#[derive(Debug, Clone, Serialize)]
pub struct CardPayment {
    pub id: String,
    /// Raw provider status string; map it with [`crate::status_map::CardPaymentStatus`].
    pub status: String,
    pub external_reference: Option<String>,
    pub transaction_amount: f64,
    pub currency_id: String,
}

/// The crypto-invoice aggregator.
#[allow(async_fn_in_trait)]
pub trait CryptoGateway {
    /// Open a payment intent. The order token travels as the provider's external reference so that notifications
    /// can be reconciled without any local storage.
    async fn create_invoice(&self, req: &InvoiceRequest) -> Result<PaymentIntent, GatewayError>;

    /// Look up the provider's ledger entry for an order token, if any.
    async fn find_payment(&self, order_token: &str) -> Result<Option<PaymentRecord>, GatewayError>;

    /// False when the client is running without credentials (mock mode).
    fn is_configured(&self) -> bool;
}

/// The card/transfer aggregator.
#[allow(async_fn_in_trait)]
pub trait CardGateway {
    /// Create a hosted-checkout preference and return the redirect URL.
    async fn create_preference(&self, req: &PreferenceRequest) -> Result<PaymentIntent, GatewayError>;

    /// Authoritative status query by the provider's payment id. Webhook bodies from this provider are never
    /// trusted; this call is the only source of truth for status mapping.
    async fn get_payment(&self, payment_id: &str) -> Result<CardPayment, GatewayError>;
}
