use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use fareflow_shared::{MarketSnapshot, TripDetails, WeatherReport};

/// Upper bound on any single gateway call. Callers wrap requests in
/// `tokio::time::timeout` with this duration and degrade to fallback
/// values on expiry.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Market data unavailable: {0}")]
    Unavailable(String),

    #[error("Gateway call timed out")]
    Timeout,
}

/// Query interface over live market data.
///
/// Implementations must be cheap to share; consumers hold them behind
/// `Arc<dyn MarketDataGateway>`.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn get_trip_data(&self, trip_id: &str) -> Result<TripDetails, MarketError>;

    async fn get_market_snapshot(&self, trip_id: &str) -> Result<MarketSnapshot, MarketError>;

    /// Numeric weather impact in −50..50
    async fn get_weather_impact(
        &self,
        location: &str,
        time: DateTime<Utc>,
    ) -> Result<f64, MarketError>;

    /// Condition and temperature, used for demand factor snapshots
    async fn get_weather(
        &self,
        location: &str,
        time: DateTime<Utc>,
    ) -> Result<WeatherReport, MarketError>;

    /// Numeric event impact in 0..100
    async fn get_event_impact(
        &self,
        location: &str,
        time: DateTime<Utc>,
    ) -> Result<f64, MarketError>;

    /// Sample of competitor prices for a comparable trip
    async fn get_competitor_pricing(&self, trip_id: &str) -> Result<Vec<f64>, MarketError>;
}
