use rpg_common::Robux;
use serde::Serialize;

/// Everything the delivery vendor needs to fulfil one order. All of it is recoverable from the order identifier.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    /// The order identifier token. The vendor deduplicates by this key, which is what makes redispatch safe in the
    /// stateless deployment.
    pub order_reference: String,
    pub roblox_username: String,
    /// Gross amount: the vendor's take-rate comes out of this.
    pub gross_amount: Robux,
    pub place_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailureReason {
    /// The vendor could not find the destination (account, gamepass or place).
    DestinationNotFound,
    /// The vendor's stock/balance cannot cover the order.
    InsufficientBalance,
    /// Network-level failure; the vendor may or may not have seen the request.
    Transport,
    Unknown,
}

/// Dispatch never throws past the vendor boundary; failures come back as structured data.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered { vendor_order_id: String },
    Failed { reason: DeliveryFailureReason, message: String },
}

#[allow(async_fn_in_trait)]
pub trait DeliveryVendor {
    /// Place one fulfilment order with the vendor. Must be called at most once per confirmed payment by the
    /// reconciler; the vendor's own dedupe on `order_reference` is the backstop.
    async fn dispatch(&self, req: &DeliveryRequest) -> DeliveryOutcome;
}
