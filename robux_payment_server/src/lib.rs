//! # Robux payment server
//! This crate hosts the HTTP server for the storefront. It is responsible for:
//! Accepting order-creation requests and opening payment intents with the configured providers.
//! Listening for incoming webhook notifications from the payment providers and the delivery vendor.
//! Verifying each notification, reconciling it against the order token it carries, and dispatching delivery.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`: Order creation.
//! * `/api/orders/status`: Polling endpoint for user-initiated status checks.
//! * `/webhooks/nowpayments`, `/webhooks/mercadopago`, `/webhooks/rbxcrate`: Provider notification endpoints.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod middleware;
pub mod rate_limiter;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
