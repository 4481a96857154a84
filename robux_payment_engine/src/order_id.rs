//! The compound order identifier.
//!
//! The deployed storefront keeps no order database. Everything a webhook handler needs to fulfil an order is carried
//! in the order identifier itself, which is passed to the payment providers as their "external reference" and echoed
//! back in every notification:
//!
//! ```text
//! ORD|<username>|<gross_robux>|<place_id>|<timestamp_ms>     (current, 5 fields)
//! ORD|<username>|<gross_robux>|<timestamp_ms>                (legacy, 4 fields)
//! ```
//!
//! The gross (post-fee) amount is encoded, not the net amount, so that the delivery vendor purchases the right
//! quantity without having to re-apply the pricing formula. The timestamp is a uniqueness and ordering aid only;
//! no business logic may depend on it.

use std::fmt::Display;

use rpg_common::Robux;
use serde::Serialize;
use thiserror::Error;

pub const ORDER_ID_TAG: &str = "ORD";
pub const ORDER_ID_SEPARATOR: char = '|';

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderIdError {
    #[error("Malformed order identifier: {0}")]
    MalformedIdentifier(String),
}

/// The fields recovered from a decoded order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedOrder {
    pub username: String,
    pub gross_amount: Robux,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<u64>,
    /// Informational only. `None` for tokens whose timestamp field is absent or unparseable.
    #[serde(skip_serializing)]
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Mint a new identifier. The username is sanitized by stripping any separator characters first, which
    /// guarantees the token decodes back into the expected number of fields.
    pub fn mint(username: &str, gross_amount: Robux, place_id: Option<u64>, timestamp_ms: i64) -> Self {
        let username = sanitize_username(username);
        let token = match place_id {
            Some(place) => format!("{ORDER_ID_TAG}|{username}|{}|{place}|{timestamp_ms}", gross_amount.value()),
            None => format!("{ORDER_ID_TAG}|{username}|{}|{timestamp_ms}", gross_amount.value()),
        };
        Self(token)
    }

    /// Decode a token into its fields.
    ///
    /// Decoding is strict about the minimum prefix (tag, username, positive gross amount, one trailing field) and
    /// tolerant of anything beyond it, so that tokens minted by future format revisions still reconcile.
    pub fn decode(token: &str) -> Result<DecodedOrder, OrderIdError> {
        let parts = token.split(ORDER_ID_SEPARATOR).collect::<Vec<&str>>();
        if parts.first() != Some(&ORDER_ID_TAG) {
            return Err(OrderIdError::MalformedIdentifier(format!("missing {ORDER_ID_TAG} tag")));
        }
        if parts.len() < 4 {
            return Err(OrderIdError::MalformedIdentifier(format!(
                "expected at least 4 fields, found {}",
                parts.len()
            )));
        }
        let username = parts[1].to_string();
        let gross = parts[2]
            .parse::<u64>()
            .ok()
            .filter(|g| *g > 0)
            .ok_or_else(|| OrderIdError::MalformedIdentifier(format!("invalid gross amount '{}'", parts[2])))?;
        // A 5+ field token carries a place id in slot 3 and the timestamp in slot 4. In the legacy 4-field form
        // slot 3 is the timestamp. Either way the timestamp is advisory and parse failures are not fatal.
        let (place_id, ts_field) = if parts.len() >= 5 {
            match parts[3].parse::<u64>() {
                Ok(place) => (Some(place), parts[4]),
                Err(_) => (None, parts[3]),
            }
        } else {
            (None, parts[3])
        };
        let timestamp_ms = ts_field.parse::<i64>().ok();
        Ok(DecodedOrder { username, gross_amount: Robux::from(gross), place_id, timestamp_ms })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

pub fn sanitize_username(username: &str) -> String {
    username.replace(ORDER_ID_SEPARATOR, "")
}
