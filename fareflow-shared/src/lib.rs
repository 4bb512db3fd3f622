pub mod models;

pub use models::demand::{DemandFactors, DemandPrediction, Trend, WeatherCondition};
pub use models::market::{HistoricalObservation, MarketSnapshot, TripDetails, WeatherReport};
pub use models::negotiation::{NegotiationOffer, NegotiationStatus, OfferParty};
pub use models::pricing::{
    CompetitorAnalysis, MarketPosition, PricingFactors, PricingRecommendation,
};

/// Round a price to two decimal places.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
