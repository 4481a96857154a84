//! # Robux payment engine
//!
//! The reconciliation core of the storefront. This crate is deliberately free of HTTP server code and of any concrete
//! payment-provider client; those live in `robux_payment_server` and `vendor_clients` respectively. What lives here:
//!
//! * The [order identifier codec](order_id), which encodes every parameter needed to fulfil an order into a single
//!   opaque token. In the stateless deployment this token *is* the order record.
//! * The [pricing engine](pricing): net→gross fee pass-through and fiat quoting.
//! * The canonical [order lifecycle](db_types::OrderStatusType) and the provider-specific
//!   [status vocabularies](status_map) that map onto it.
//! * The [reconciler](reconcile::ReconcileApi), which turns verified payment events into idempotent state transitions
//!   and at-most-once delivery dispatch.
//! * The [cached exchange rate lookup](exchange_rate::CachedRate).
//! * The [trait seams](traits) that the vendor clients implement.

pub mod db_types;
pub mod exchange_rate;
pub mod order_id;
pub mod pricing;
pub mod reconcile;
pub mod status_map;
pub mod traits;

pub use reconcile::{ReconcileApi, ReconcileOutcome};
