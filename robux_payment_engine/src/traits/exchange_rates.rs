use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Could not fetch exchange rate: {0}")]
pub struct RateSourceError(pub String);

/// An upstream source for the USD→local-currency exchange rate. Always consumed through
/// [`crate::exchange_rate::CachedRate`], never directly: checkout must not block or fail on a rate lookup.
#[allow(async_fn_in_trait)]
pub trait RateSource {
    async fn fetch_rate(&self) -> Result<f64, RateSourceError>;
}
