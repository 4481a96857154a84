//! The reconciler: verified payment events in, idempotent state transitions and at-most-once dispatch out.
//!
//! Authentication of the event is the *caller's* job (HMAC middleware or authoritative re-query, depending on the
//! provider) and so is mapping the provider vocabulary to a canonical status. By the time an event reaches
//! [`ReconcileApi::process_payment_event`] it is trusted and canonical; everything after that point is absorbed
//! into a [`ReconcileOutcome`] so webhook endpoints can always acknowledge receipt.

use log::*;

use crate::{
    db_types::OrderStatusType,
    order_id::OrderId,
    traits::{DeliveryFailureReason, DeliveryOutcome, DeliveryRequest, DeliveryVendor, StatusStore},
};

/// What became of a payment event. No variant is an error: webhook handlers acknowledge all of them with a success
/// response, and anything that needs human attention has already been logged.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The event carried nothing actionable (e.g. the order identifier does not decode). Acknowledged and dropped —
    /// answering with an error would only trigger a provider retry storm over an event we can never act on.
    Ignored { reason: String },
    /// A non-final status was folded into the store. Carries the status now in effect.
    Recorded(OrderStatusType),
    /// Payment finalized and the delivery vendor accepted the order.
    Delivered { vendor_order_id: String },
    /// Payment finalized but another event already claimed the dispatch. Normal under webhook redelivery.
    AlreadyDispatched,
    /// Payment finalized but the vendor refused the delivery. The order is Failed; the payment provider still gets
    /// a success acknowledgement.
    DeliveryFailed { reason: DeliveryFailureReason, message: String },
}

pub struct ReconcileApi<S, D> {
    store: S,
    vendor: D,
}

impl<S, D> ReconcileApi<S, D>
where
    S: StatusStore,
    D: DeliveryVendor,
{
    pub fn new(store: S, vendor: D) -> Self {
        Self { store, vendor }
    }

    /// Drive the order identified by `order_token` towards `status`.
    ///
    /// `status` must already be canonical. `Processing` means "payment finalized, deliver now"; the dispatch is
    /// guarded by a compare-and-set on the status store so that redelivered webhooks cause at most one vendor call.
    pub async fn process_payment_event(&self, order_token: &str, status: OrderStatusType) -> ReconcileOutcome {
        let decoded = match OrderId::decode(order_token) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("🔄️ Payment event for undecodable order '{order_token}'. {e}. Ignoring.");
                return ReconcileOutcome::Ignored { reason: e.to_string() };
            },
        };
        if status != OrderStatusType::Processing {
            let effective = self.store.record(order_token, status);
            debug!("🔄️ Order {order_token} recorded as {effective} (event said {status})");
            return ReconcileOutcome::Recorded(effective);
        }
        if !self.store.begin_dispatch(order_token) {
            info!("🔄️ Order {order_token} was already dispatched or is terminal. Skipping delivery.");
            return ReconcileOutcome::AlreadyDispatched;
        }
        let request = DeliveryRequest {
            order_reference: order_token.to_string(),
            roblox_username: decoded.username,
            gross_amount: decoded.gross_amount,
            place_id: decoded.place_id,
        };
        info!(
            "🔄️ Dispatching delivery for order {order_token}: {} to '{}'",
            request.gross_amount, request.roblox_username
        );
        match self.vendor.dispatch(&request).await {
            DeliveryOutcome::Delivered { vendor_order_id } => {
                self.store.record(order_token, OrderStatusType::Completed);
                info!("🔄️✅️ Order {order_token} delivered. Vendor order id: {vendor_order_id}");
                ReconcileOutcome::Delivered { vendor_order_id }
            },
            DeliveryOutcome::Failed { reason, message } => {
                self.store.record(order_token, OrderStatusType::Failed);
                error!("🔄️❌️ Delivery failed for order {order_token} ({reason:?}): {message}");
                ReconcileOutcome::DeliveryFailed { reason, message }
            },
        }
    }
}
