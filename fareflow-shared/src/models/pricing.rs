use serde::{Deserialize, Serialize};

/// Inputs that shaped a pricing recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingFactors {
    /// 0–100
    pub demand_level: f64,
    /// 0–100
    pub supply_level: f64,
    /// Fractional hour of day, 0.0–24.0
    pub time_of_day: f64,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// −50..50
    pub weather_impact: f64,
    /// −50..50
    pub event_impact: f64,
    /// Percentage deviation of the competitor mean from the reference price
    pub competitor_pricing: f64,
    /// Per-user adjustment, −10..10 percent
    pub user_history: f64,
}

impl Default for PricingFactors {
    fn default() -> Self {
        Self {
            demand_level: 50.0,
            supply_level: 50.0,
            time_of_day: 12.0,
            day_of_week: 0,
            weather_impact: 0.0,
            event_impact: 0.0,
            competitor_pricing: 0.0,
            user_history: 0.0,
        }
    }
}

/// Where a price sits relative to the competitor average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketPosition {
    Low,
    Medium,
    High,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub average_price: f64,
    pub market_position: MarketPosition,
}

/// A bounded price recommendation for one trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRecommendation {
    /// Always within [base × 0.7, base × 3.0]
    pub recommended_price: f64,
    /// 50–95
    pub confidence: f64,
    pub reason: String,
    pub factors: PricingFactors,
    /// Projected monthly revenue delta at the recommended price
    pub potential_revenue: f64,
    pub competitor_analysis: CompetitorAnalysis,
}
