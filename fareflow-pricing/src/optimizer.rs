use chrono::{DateTime, Datelike, Timelike, Utc};
use std::sync::Arc;
use tokio::time::timeout;

use fareflow_market::{MarketDataGateway, MarketError, GATEWAY_TIMEOUT, REFERENCE_RATE_PER_KM};
use fareflow_shared::{
    round_price, CompetitorAnalysis, MarketPosition, MarketSnapshot, PricingFactors,
    PricingRecommendation, TripDetails,
};

/// Floor multiplier: never discount below 70% of the base fare.
pub const MIN_DISCOUNT: f64 = 0.7;
/// Ceiling multiplier: never surge above 3x the base fare.
pub const MAX_SURGE: f64 = 3.0;
/// Starting multiplier before demand scaling.
pub const BASE_SURGE: f64 = 1.2;

/// Price elasticity of demand; dampens the raw surge component.
const ELASTICITY: f64 = -0.3;
const COMPETITOR_WEIGHT: f64 = 0.8;
const URGENCY_WEIGHT: f64 = 0.6;
const WEATHER_RATE: f64 = 0.005;
const EVENT_RATE: f64 = 0.003;

// Demand score weights
const WEIGHT_TIME: f64 = 0.3;
const WEIGHT_DAY: f64 = 0.2;
const WEIGHT_WEATHER: f64 = 0.15;
const WEIGHT_EVENTS: f64 = 0.15;
const WEIGHT_HISTORICAL: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub gateway_timeout: std::time::Duration,
    /// Reference fare per kilometre for competitor comparison
    pub reference_rate_per_km: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: GATEWAY_TIMEOUT,
            reference_rate_per_km: REFERENCE_RATE_PER_KM,
        }
    }
}

/// Turns a demand estimate and a live market snapshot into a bounded
/// price recommendation with a human-readable rationale.
///
/// Stateless per call; safe to share across trips behind an `Arc`.
pub struct PriceOptimizer {
    gateway: Arc<dyn MarketDataGateway>,
    config: OptimizerConfig,
}

impl PriceOptimizer {
    pub fn new(gateway: Arc<dyn MarketDataGateway>) -> Self {
        Self::with_config(gateway, OptimizerConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn MarketDataGateway>, config: OptimizerConfig) -> Self {
        Self { gateway, config }
    }

    /// Recommend a price for `trip_id`, bounded to
    /// `[base_price × 0.7, base_price × 3.0]`.
    ///
    /// Never fails: gateway problems degrade to a recommendation equal
    /// to the base price with floor confidence.
    pub async fn calculate_optimal_price(
        &self,
        trip_id: &str,
        base_price: f64,
    ) -> PricingRecommendation {
        self.calculate_for_user(trip_id, base_price, 0.0).await
    }

    /// Same as `calculate_optimal_price` with a per-user fare
    /// adjustment in −10..10 percent.
    pub async fn calculate_for_user(
        &self,
        trip_id: &str,
        base_price: f64,
        user_history: f64,
    ) -> PricingRecommendation {
        match self.try_calculate(trip_id, base_price, user_history, Utc::now()).await {
            Ok(recommendation) => recommendation,
            Err(err) => {
                tracing::warn!(trip_id, %err, "pricing inputs unavailable, returning base price");
                Self::fallback(base_price)
            }
        }
    }

    /// Deterministic core: all inputs, including the clock, are explicit.
    pub(crate) async fn try_calculate(
        &self,
        trip_id: &str,
        base_price: f64,
        user_history: f64,
        now: DateTime<Utc>,
    ) -> Result<PricingRecommendation, MarketError> {
        let trip = self.fetch(self.gateway.get_trip_data(trip_id)).await?;
        let snapshot = self.fetch(self.gateway.get_market_snapshot(trip_id)).await?;
        let weather_impact = self
            .fetch(self.gateway.get_weather_impact(&trip.from, now))
            .await?
            .clamp(-50.0, 50.0);
        let event_impact = self
            .fetch(self.gateway.get_event_impact(&trip.from, now))
            .await?
            .clamp(-50.0, 50.0);
        let competitors = self.fetch(self.gateway.get_competitor_pricing(trip_id)).await?;

        let factors = self.build_factors(
            &trip,
            &snapshot,
            weather_impact,
            event_impact,
            &competitors,
            user_history,
            now,
        );

        let score = demand_score(&factors);
        let multiplier = derive_multiplier(score, &factors);
        let recommended_price = round_price(base_price * multiplier);

        let hours_until_departure = (trip.departure_time - now).num_hours();
        let confidence = confidence_for(&snapshot, weather_impact, event_impact, hours_until_departure);

        let competitor_mean = mean(&competitors);
        let competitor_analysis = CompetitorAnalysis {
            average_price: round_price(competitor_mean),
            market_position: market_position(recommended_price, competitor_mean),
        };

        let potential_revenue = round_price(
            (recommended_price - base_price) * (snapshot.recent_bookings as f64 / 30.0) * 30.0,
        );

        let reason = build_reason(&factors, base_price, recommended_price);

        tracing::debug!(
            trip_id,
            multiplier,
            recommended_price,
            confidence,
            "price recommendation computed"
        );

        Ok(PricingRecommendation {
            recommended_price,
            confidence,
            reason,
            factors,
            potential_revenue,
            competitor_analysis,
        })
    }

    async fn fetch<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, MarketError>>,
    ) -> Result<T, MarketError> {
        timeout(self.config.gateway_timeout, fut)
            .await
            .map_err(|_| MarketError::Timeout)?
    }

    #[allow(clippy::too_many_arguments)]
    fn build_factors(
        &self,
        trip: &TripDetails,
        snapshot: &MarketSnapshot,
        weather_impact: f64,
        event_impact: f64,
        competitors: &[f64],
        user_history: f64,
        now: DateTime<Utc>,
    ) -> PricingFactors {
        let drivers = snapshot.available_drivers.max(1) as f64;
        let waiting = snapshot.waiting_passengers.max(1) as f64;

        let demand_level = (snapshot.waiting_passengers as f64 / drivers * 30.0
            + snapshot.recent_bookings as f64 * 2.0
            + event_impact.max(0.0) * 0.3)
            .clamp(0.0, 100.0);

        let mut supply_level = snapshot.available_drivers as f64 / waiting * 40.0;
        if snapshot.active_trips > 0 {
            supply_level += 10.0;
        }
        let supply_level = supply_level.clamp(0.0, 100.0);

        let reference = trip.distance_km * self.config.reference_rate_per_km;
        let competitor_pricing = if competitors.is_empty() || reference <= 0.0 {
            0.0
        } else {
            (mean(competitors) - reference) / reference * 100.0
        };

        PricingFactors {
            demand_level,
            supply_level,
            time_of_day: now.hour() as f64 + now.minute() as f64 / 60.0,
            day_of_week: now.weekday().num_days_from_monday(),
            weather_impact,
            event_impact,
            competitor_pricing,
            user_history: user_history.clamp(-10.0, 10.0),
        }
    }

    fn fallback(base_price: f64) -> PricingRecommendation {
        PricingRecommendation {
            recommended_price: round_price(base_price),
            confidence: 50.0,
            reason: "Market data unavailable; keeping the base fare".to_string(),
            factors: PricingFactors::default(),
            potential_revenue: 0.0,
            competitor_analysis: CompetitorAnalysis {
                average_price: round_price(base_price),
                market_position: MarketPosition::Medium,
            },
        }
    }
}

/// Weighted demand score over normalized factors, in [0, 1].
fn demand_score(factors: &PricingFactors) -> f64 {
    let time_score = match factors.time_of_day as u32 {
        7..=9 => 0.85,
        16..=19 => 0.9,
        10..=15 => 0.55,
        22..=23 | 0..=1 => 0.7,
        _ => 0.3,
    };
    let day_score = match factors.day_of_week {
        4 => 0.8,
        5 => 0.85,
        6 => 0.65,
        _ => 0.55,
    };
    let weather_score = (factors.weather_impact + 50.0) / 100.0;
    let event_score = (factors.event_impact + 50.0) / 100.0;
    let historical_score = factors.demand_level / 100.0;

    (time_score * WEIGHT_TIME
        + day_score * WEIGHT_DAY
        + weather_score * WEIGHT_WEATHER
        + event_score * WEIGHT_EVENTS
        + historical_score * WEIGHT_HISTORICAL)
        .clamp(0.0, 1.0)
}

/// Surge pipeline: demand scaling, elasticity damping, competitor
/// correction, scarcity urgency, weather/event/user nudges, then the
/// hard [0.7, 3.0] clamp.
fn derive_multiplier(score: f64, factors: &PricingFactors) -> f64 {
    let mut multiplier = BASE_SURGE + score * (MAX_SURGE - BASE_SURGE);
    multiplier = 1.0 + (1.0 + ELASTICITY) * (multiplier - 1.0);
    multiplier *= 1.0 + (factors.competitor_pricing / 100.0) * COMPETITOR_WEIGHT;
    multiplier += (1.0 - factors.supply_level / 100.0).max(0.0) * URGENCY_WEIGHT;
    multiplier += factors.weather_impact * WEATHER_RATE;
    multiplier += factors.event_impact * EVENT_RATE;
    multiplier += factors.user_history / 100.0;
    multiplier.clamp(MIN_DISCOUNT, MAX_SURGE)
}

fn confidence_for(
    snapshot: &MarketSnapshot,
    weather_impact: f64,
    event_impact: f64,
    hours_until_departure: i64,
) -> f64 {
    let mut confidence: f64 = 70.0;
    if snapshot.recent_bookings > 10 {
        confidence += 10.0;
    }
    if snapshot.active_trips > 5 {
        confidence += 5.0;
    }
    if weather_impact > 25.0 {
        confidence -= 10.0;
    }
    if event_impact > 30.0 {
        confidence -= 5.0;
    }
    if hours_until_departure < 2 {
        confidence += 10.0;
    } else if hours_until_departure > 24 {
        confidence -= 10.0;
    }
    confidence.clamp(50.0, 95.0)
}

fn market_position(recommended: f64, competitor_mean: f64) -> MarketPosition {
    if competitor_mean <= 0.0 {
        return MarketPosition::Medium;
    }
    let ratio = recommended / competitor_mean;
    if ratio < 0.9 {
        MarketPosition::Low
    } else if ratio < 1.1 {
        MarketPosition::Medium
    } else if ratio < 1.3 {
        MarketPosition::High
    } else {
        MarketPosition::Premium
    }
}

fn build_reason(factors: &PricingFactors, base_price: f64, recommended: f64) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if factors.demand_level > 70.0 {
        parts.push("high demand");
    } else if factors.demand_level < 30.0 {
        parts.push("soft demand");
    }
    if factors.supply_level < 30.0 {
        parts.push("limited driver availability");
    }
    if factors.weather_impact > 25.0 {
        parts.push("adverse weather");
    }
    if factors.event_impact > 30.0 {
        parts.push("nearby events");
    }
    if matches!(factors.time_of_day as u32, 7..=9 | 16..=19) {
        parts.push("peak travel time");
    }
    if factors.competitor_pricing.abs() > 10.0 {
        parts.push("competitor price gap");
    }

    let change_pct = if base_price > 0.0 {
        (recommended - base_price) / base_price * 100.0
    } else {
        0.0
    };
    let direction = if change_pct >= 0.0 { "increase" } else { "decrease" };

    if parts.is_empty() {
        format!(
            "Market conditions are balanced; {:.1}% {} over the base fare",
            change_pct.abs(),
            direction
        )
    } else {
        format!(
            "{} driving a {:.1}% {} over the base fare",
            capitalize(&parts.join(", ")),
            change_pct.abs(),
            direction
        )
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fareflow_market::StaticGateway;

    fn fixed_now() -> DateTime<Utc> {
        // Monday 2025-06-02 08:00 UTC
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
    }

    fn optimizer(gateway: StaticGateway) -> PriceOptimizer {
        PriceOptimizer::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_recommendation_respects_bounds() {
        let optimizer = optimizer(StaticGateway::calm());
        for base in [5.0, 50.0, 500.0] {
            let rec = optimizer
                .try_calculate("trip-1", base, 0.0, fixed_now())
                .await
                .unwrap();
            assert!(rec.recommended_price >= base * MIN_DISCOUNT);
            assert!(rec.recommended_price <= base * MAX_SURGE);
            assert!((50.0..=95.0).contains(&rec.confidence));
        }
    }

    #[tokio::test]
    async fn test_scarcity_surge_clamps_at_ceiling() {
        // Heavy demand against scarce supply, above-reference
        // competitor prices, bad weather and a large event
        let mut gateway = StaticGateway::calm();
        gateway.snapshot = MarketSnapshot {
            active_trips: 0,
            waiting_passengers: 24,
            available_drivers: 6,
            recent_bookings: 0,
        };
        gateway.weather_impact = 30.0;
        gateway.event_impact = 50.0;
        gateway.trip.distance_km = 10.0;
        gateway.competitor_prices = vec![31.25; 5]; // +25% over the 25.0 reference

        let rec = optimizer(gateway)
            .try_calculate("trip-1", 100.0, 0.0, fixed_now())
            .await
            .unwrap();

        // demand_level pins to 100, supply_level sits at 10
        assert_eq!(rec.factors.supply_level, 10.0);
        assert!(rec.factors.demand_level > 90.0);
        assert_eq!(rec.recommended_price, 300.0);
        assert_eq!(
            rec.competitor_analysis.market_position,
            MarketPosition::Premium
        );
    }

    #[tokio::test]
    async fn test_fallback_on_gateway_failure() {
        let mut gateway = StaticGateway::calm();
        gateway.fail = true;

        let rec = optimizer(gateway).calculate_optimal_price("trip-1", 42.0).await;
        assert_eq!(rec.recommended_price, 42.0);
        assert_eq!(rec.confidence, 50.0);
        assert_eq!(
            rec.competitor_analysis.market_position,
            MarketPosition::Medium
        );
    }

    #[tokio::test]
    async fn test_identical_inputs_identical_outputs() {
        let a = optimizer(StaticGateway::calm())
            .try_calculate("trip-1", 80.0, 0.0, fixed_now())
            .await
            .unwrap();
        let b = optimizer(StaticGateway::calm())
            .try_calculate("trip-1", 80.0, 0.0, fixed_now())
            .await
            .unwrap();

        assert_eq!(a.recommended_price, b.recommended_price);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.reason, b.reason);
    }

    #[tokio::test]
    async fn test_user_history_discount_lowers_price() {
        let base = optimizer(StaticGateway::calm())
            .try_calculate("trip-1", 100.0, 0.0, fixed_now())
            .await
            .unwrap();
        let loyal = optimizer(StaticGateway::calm())
            .try_calculate("trip-1", 100.0, -8.0, fixed_now())
            .await
            .unwrap();

        assert!(loyal.recommended_price < base.recommended_price);
    }

    #[tokio::test]
    async fn test_confidence_adjustments() {
        let mut gateway = StaticGateway::calm();
        gateway.snapshot.recent_bookings = 15;
        gateway.snapshot.active_trips = 8;
        gateway.trip.departure_time = fixed_now() + Duration::hours(1);

        let rec = optimizer(gateway)
            .try_calculate("trip-1", 50.0, 0.0, fixed_now())
            .await
            .unwrap();
        // 70 + 10 (bookings) + 5 (active trips) + 10 (imminent departure)
        assert_eq!(rec.confidence, 95.0);
    }

    #[tokio::test]
    async fn test_revenue_projection() {
        let mut gateway = StaticGateway::calm();
        gateway.snapshot.recent_bookings = 30;

        let rec = optimizer(gateway)
            .try_calculate("trip-1", 100.0, 0.0, fixed_now())
            .await
            .unwrap();
        let expected = round_price((rec.recommended_price - 100.0) * 30.0);
        assert_eq!(rec.potential_revenue, expected);
    }

    #[test]
    fn test_market_position_buckets() {
        assert_eq!(market_position(80.0, 100.0), MarketPosition::Low);
        assert_eq!(market_position(100.0, 100.0), MarketPosition::Medium);
        assert_eq!(market_position(115.0, 100.0), MarketPosition::High);
        assert_eq!(market_position(140.0, 100.0), MarketPosition::Premium);
    }

    #[test]
    fn test_multiplier_floor() {
        let factors = PricingFactors {
            demand_level: 0.0,
            supply_level: 100.0,
            time_of_day: 3.0,
            day_of_week: 1,
            weather_impact: -50.0,
            event_impact: -50.0,
            competitor_pricing: -40.0,
            user_history: -10.0,
        };
        let m = derive_multiplier(demand_score(&factors), &factors);
        assert_eq!(m, MIN_DISCOUNT);
    }
}
