use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather buckets used by the demand and pricing models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Storm,
    Fog,
}

/// Direction of the short-term demand trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Immutable factor snapshot, built fresh for every prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandFactors {
    /// Fractional hour of day, 0.0–24.0
    pub time_of_day: f64,
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub weather: WeatherCondition,
    pub temperature: f64,
    pub is_holiday: bool,
    pub is_weekend: bool,
    /// 0–100
    pub event_impact: f64,
    /// 0–100, average of matching historical observations
    pub historical_demand: f64,
    /// 0–100
    pub competitor_activity: f64,
    /// 0–100
    pub economic_indicator: f64,
}

impl DemandFactors {
    /// Neutral factors used when gateway data is unavailable
    pub fn neutral(timestamp: DateTime<Utc>) -> Self {
        use chrono::{Datelike, Timelike};
        let day_of_week = timestamp.weekday().num_days_from_monday();
        Self {
            time_of_day: timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0,
            day_of_week,
            weather: WeatherCondition::Clear,
            temperature: 18.0,
            is_holiday: false,
            is_weekend: day_of_week >= 5,
            event_impact: 0.0,
            historical_demand: 50.0,
            competitor_activity: 50.0,
            economic_indicator: 50.0,
        }
    }
}

/// Result of a single demand prediction. Ephemeral, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandPrediction {
    /// 0–100
    pub predicted_demand: f64,
    /// 30–95
    pub confidence: f64,
    pub time_horizon_hours: u32,
    pub factors: DemandFactors,
    pub trend: Trend,
    /// 0–100
    pub volatility: f64,
    pub recommendations: Vec<String>,
}
