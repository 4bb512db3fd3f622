use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::demand::DemandFactors;

/// Trip metadata as supplied by the market data gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDetails {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub departure_time: DateTime<Utc>,
    pub vehicle_type: String,
}

/// Live supply/demand counts around a trip
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub active_trips: u32,
    pub waiting_passengers: u32,
    pub available_drivers: u32,
    pub recent_bookings: u32,
}

/// Current weather around a location
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeatherReport {
    pub condition: super::demand::WeatherCondition,
    pub temperature: f64,
}

/// One recorded demand observation, owned by the bounded history store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalObservation {
    pub timestamp: DateTime<Utc>,
    /// 0–100
    pub demand: f64,
    pub factors: DemandFactors,
}
