//! The trait seams between the reconciliation core and the outside world.
//!
//! The concrete implementations live in the `vendor_clients` crate; tests substitute their own.

mod delivery;
mod exchange_rates;
mod gateways;
mod status_store;

pub use delivery::{DeliveryFailureReason, DeliveryOutcome, DeliveryRequest, DeliveryVendor};
pub use exchange_rates::{RateSource, RateSourceError};
pub use gateways::{
    CardGateway,
    CardPayment,
    CryptoGateway,
    GatewayError,
    InvoiceRequest,
    PaymentIntent,
    PaymentRecord,
    PreferenceRequest,
};
pub use status_store::{InMemoryStatusStore, StatelessStatusStore, StatusStore};
