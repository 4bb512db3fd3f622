use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::sync::Arc;
use tokio::time::timeout;

use fareflow_market::{HistoryStore, MarketDataGateway, MarketError, GATEWAY_TIMEOUT};
use fareflow_shared::{DemandFactors, DemandPrediction, Trend, WeatherCondition};

/// Horizons covered by `predict_multiple_horizons`, in hours.
pub const PREDICTION_HORIZONS: [u32; 5] = [1, 6, 12, 24, 72];

// Factor weights for the combined demand score
const WEIGHT_TIME: f64 = 0.25;
const WEIGHT_DAY: f64 = 0.20;
const WEIGHT_WEATHER: f64 = 0.15;
const WEIGHT_EVENTS: f64 = 0.15;
const WEIGHT_HISTORICAL: f64 = 0.15;
const WEIGHT_ECONOMIC: f64 = 0.10;

// Share of the score taken from the live factor blend vs the
// historical average, when matching observations exist
const FACTOR_BLEND: f64 = 0.7;
const HISTORY_BLEND: f64 = 0.3;

const WEEKEND_MULTIPLIER: f64 = 1.2;
const HOLIDAY_MULTIPLIER: f64 = 1.3;

// Event impact thresholds driving the confidence adjustments
const LOW_EVENT_IMPACT: f64 = 20.0;
const HIGH_EVENT_IMPACT: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Neutral macro indicator when no external feed is wired, 0–100
    pub economic_indicator: f64,
    pub gateway_timeout: std::time::Duration,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            economic_indicator: 50.0,
            gateway_timeout: GATEWAY_TIMEOUT,
        }
    }
}

/// Estimates ride demand for a location and time from live market
/// factors and the recorded observation history.
///
/// Stateless per call; the only shared state is the injected
/// read-mostly history store.
pub struct DemandPredictor {
    gateway: Arc<dyn MarketDataGateway>,
    history: Arc<HistoryStore>,
    config: PredictorConfig,
}

impl DemandPredictor {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, history: Arc<HistoryStore>) -> Self {
        Self::with_config(gateway, history, PredictorConfig::default())
    }

    pub fn with_config(
        gateway: Arc<dyn MarketDataGateway>,
        history: Arc<HistoryStore>,
        config: PredictorConfig,
    ) -> Self {
        Self {
            gateway,
            history,
            config,
        }
    }

    /// Predict demand `horizon_hours` ahead of `timestamp`.
    ///
    /// Never fails: any gateway problem degrades to a documented
    /// fallback prediction with floor confidence.
    pub async fn predict(
        &self,
        location: &str,
        timestamp: DateTime<Utc>,
        horizon_hours: u32,
    ) -> DemandPrediction {
        let target = timestamp + Duration::hours(horizon_hours as i64);
        match self.gather_factors(location, target).await {
            Ok(factors) => self.score(factors, horizon_hours),
            Err(err) => {
                tracing::warn!(location, %err, "factor gathering failed, using fallback prediction");
                Self::fallback(target, horizon_hours)
            }
        }
    }

    /// One prediction per entry in `PREDICTION_HORIZONS`, in order.
    pub async fn predict_multiple_horizons(
        &self,
        location: &str,
        base: DateTime<Utc>,
    ) -> Vec<DemandPrediction> {
        let mut out = Vec::with_capacity(PREDICTION_HORIZONS.len());
        for horizon in PREDICTION_HORIZONS {
            out.push(self.predict(location, base, horizon).await);
        }
        out
    }

    async fn gather_factors(
        &self,
        location: &str,
        target: DateTime<Utc>,
    ) -> Result<DemandFactors, MarketError> {
        let weather = timeout(
            self.config.gateway_timeout,
            self.gateway.get_weather(location, target),
        )
        .await
        .map_err(|_| MarketError::Timeout)??;

        let event_impact = timeout(
            self.config.gateway_timeout,
            self.gateway.get_event_impact(location, target),
        )
        .await
        .map_err(|_| MarketError::Timeout)??;

        let day_of_week = target.weekday().num_days_from_monday();
        let matched = self
            .history
            .matching(target.hour(), day_of_week);
        let historical_demand = if matched.is_empty() {
            50.0
        } else {
            matched.iter().map(|o| o.demand).sum::<f64>() / matched.len() as f64
        };

        Ok(DemandFactors {
            time_of_day: target.hour() as f64 + target.minute() as f64 / 60.0,
            day_of_week,
            weather: weather.condition,
            temperature: weather.temperature,
            is_holiday: is_public_holiday(target),
            is_weekend: day_of_week >= 5,
            event_impact: event_impact.clamp(0.0, 100.0),
            historical_demand,
            competitor_activity: 50.0,
            economic_indicator: self.config.economic_indicator,
        })
    }

    fn score(&self, factors: DemandFactors, horizon_hours: u32) -> DemandPrediction {
        let matched = self
            .history
            .matching(factors.time_of_day as u32, factors.day_of_week);

        let weighted = time_of_day_score(factors.time_of_day) * WEIGHT_TIME
            + day_of_week_score(factors.day_of_week) * WEIGHT_DAY
            + weather_score(factors.weather) * WEIGHT_WEATHER
            + factors.event_impact * WEIGHT_EVENTS
            + factors.historical_demand * WEIGHT_HISTORICAL
            + factors.economic_indicator * WEIGHT_ECONOMIC;

        let mut demand = if matched.is_empty() {
            weighted
        } else {
            let hist_avg =
                matched.iter().map(|o| o.demand).sum::<f64>() / matched.len() as f64;
            weighted * FACTOR_BLEND + hist_avg * HISTORY_BLEND
        };

        if factors.is_weekend {
            demand *= WEEKEND_MULTIPLIER;
        }
        if factors.is_holiday {
            demand *= HOLIDAY_MULTIPLIER;
        }
        let demand = demand.clamp(0.0, 100.0);

        let mut confidence: f64 = 60.0;
        if matched.len() > 10 {
            confidence += 20.0;
        } else if matched.len() > 5 {
            confidence += 10.0;
        }
        if factors.event_impact < LOW_EVENT_IMPACT {
            confidence += 10.0;
        }
        if factors.weather == WeatherCondition::Clear {
            confidence += 5.0;
        }
        if factors.event_impact > HIGH_EVENT_IMPACT {
            confidence -= 15.0;
        }
        if factors.weather == WeatherCondition::Storm {
            confidence -= 10.0;
        }
        let confidence = confidence.clamp(30.0, 95.0);

        let series: Vec<f64> = matched.iter().map(|o| o.demand).collect();
        let trend = detect_trend(&series);
        let volatility = population_std_dev(&series).min(100.0);

        DemandPrediction {
            predicted_demand: demand,
            confidence,
            time_horizon_hours: horizon_hours,
            trend,
            volatility,
            recommendations: build_recommendations(demand, trend, volatility),
            factors,
        }
    }

    fn fallback(target: DateTime<Utc>, horizon_hours: u32) -> DemandPrediction {
        DemandPrediction {
            predicted_demand: 50.0,
            confidence: 30.0,
            time_horizon_hours: horizon_hours,
            factors: DemandFactors::neutral(target),
            trend: Trend::Stable,
            volatility: 20.0,
            recommendations: vec![
                "Market data was unavailable; this is a neutral fallback estimate".to_string(),
            ],
        }
    }
}

/// Demand pressure by hour of day: commute peaks, a midday plateau and
/// a late-night bump.
fn time_of_day_score(time_of_day: f64) -> f64 {
    match time_of_day as u32 {
        7..=9 => 85.0,
        16..=19 => 90.0,
        10..=15 => 55.0,
        22..=23 | 0..=1 => 70.0,
        _ => 30.0,
    }
}

fn day_of_week_score(day_of_week: u32) -> f64 {
    match day_of_week {
        4 => 80.0, // Friday
        5 => 85.0, // Saturday
        6 => 65.0, // Sunday
        _ => 55.0,
    }
}

/// Worse weather pushes riders off the street and into cars.
fn weather_score(weather: WeatherCondition) -> f64 {
    match weather {
        WeatherCondition::Clear => 40.0,
        WeatherCondition::Cloudy => 50.0,
        WeatherCondition::Fog => 65.0,
        WeatherCondition::Rain => 75.0,
        WeatherCondition::Snow => 85.0,
        WeatherCondition::Storm => 90.0,
    }
}

/// Compare the mean of the last three points against the three before
/// them. Needs at least six points, otherwise reports `Stable`.
fn detect_trend(series: &[f64]) -> Trend {
    if series.len() < 6 {
        return Trend::Stable;
    }
    let recent: f64 = series[series.len() - 3..].iter().sum::<f64>() / 3.0;
    let previous: f64 =
        series[series.len() - 6..series.len() - 3].iter().sum::<f64>() / 3.0;
    if previous == 0.0 {
        return Trend::Stable;
    }
    let change = (recent - previous) / previous;
    if change > 0.10 {
        Trend::Increasing
    } else if change < -0.10 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

pub(crate) fn population_std_dev(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mean = series.iter().sum::<f64>() / series.len() as f64;
    let variance =
        series.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / series.len() as f64;
    variance.sqrt()
}

fn build_recommendations(demand: f64, trend: Trend, volatility: f64) -> Vec<String> {
    let mut recs = Vec::new();
    if demand > 75.0 {
        recs.push("Demand well above normal; surge pricing is justified".to_string());
    } else if demand < 30.0 {
        recs.push("Low demand expected; promotional discounts may fill capacity".to_string());
    }
    match trend {
        Trend::Increasing => {
            recs.push("Demand is trending up; hold or raise prices".to_string())
        }
        Trend::Decreasing => {
            recs.push("Demand is trending down; consider easing prices".to_string())
        }
        Trend::Stable => {}
    }
    if volatility > 40.0 {
        recs.push("Volatile demand window; refresh predictions frequently".to_string());
    }
    if recs.is_empty() {
        recs.push("Demand within normal range; no pricing action needed".to_string());
    }
    recs
}

/// Fixed-date public holidays observed by the pricing model.
fn is_public_holiday(date: DateTime<Utc>) -> bool {
    matches!(
        (date.month(), date.day()),
        (1, 1) | (5, 1) | (7, 4) | (12, 25) | (12, 26) | (12, 31)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fareflow_market::StaticGateway;

    fn monday_morning() -> DateTime<Utc> {
        // Monday 2025-06-02 08:00 UTC
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
    }

    fn predictor_with(gateway: StaticGateway, history: Arc<HistoryStore>) -> DemandPredictor {
        DemandPredictor::new(Arc::new(gateway), history)
    }

    #[tokio::test]
    async fn test_prediction_stays_in_bounds() {
        let predictor = predictor_with(StaticGateway::calm(), Arc::new(HistoryStore::new()));
        let prediction = predictor.predict("downtown", monday_morning(), 0).await;

        assert!((0.0..=100.0).contains(&prediction.predicted_demand));
        assert!((30.0..=95.0).contains(&prediction.confidence));
    }

    #[tokio::test]
    async fn test_fallback_on_gateway_failure() {
        let mut gateway = StaticGateway::calm();
        gateway.fail = true;
        let predictor = predictor_with(gateway, Arc::new(HistoryStore::new()));

        let prediction = predictor.predict("downtown", monday_morning(), 6).await;
        assert_eq!(prediction.predicted_demand, 50.0);
        assert_eq!(prediction.confidence, 30.0);
        assert_eq!(prediction.trend, Trend::Stable);
        assert_eq!(prediction.volatility, 20.0);
        assert_eq!(prediction.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_historical_blend_pulls_towards_history() {
        let history = Arc::new(HistoryStore::new());
        let ts = monday_morning();
        // Heavy recorded demand at the same Monday-morning slot
        for _ in 0..8 {
            history.record(95.0, DemandFactors::neutral(ts), ts);
        }
        let with_history =
            predictor_with(StaticGateway::calm(), history).predict("downtown", ts, 0).await;
        let without_history =
            predictor_with(StaticGateway::calm(), Arc::new(HistoryStore::new()))
                .predict("downtown", ts, 0)
                .await;

        assert!(with_history.predicted_demand > without_history.predicted_demand);
    }

    #[tokio::test]
    async fn test_confidence_rewards_deep_history() {
        let history = Arc::new(HistoryStore::new());
        let ts = monday_morning();
        for _ in 0..12 {
            history.record(60.0, DemandFactors::neutral(ts), ts);
        }
        let deep = predictor_with(StaticGateway::calm(), history)
            .predict("downtown", ts, 0)
            .await;
        let shallow = predictor_with(StaticGateway::calm(), Arc::new(HistoryStore::new()))
            .predict("downtown", ts, 0)
            .await;

        assert!(deep.confidence > shallow.confidence);
    }

    #[tokio::test]
    async fn test_trend_detection_from_history() {
        let history = Arc::new(HistoryStore::new());
        let ts = monday_morning();
        for demand in [40.0, 42.0, 41.0, 60.0, 65.0, 70.0] {
            history.record(demand, DemandFactors::neutral(ts), ts);
        }
        let prediction = predictor_with(StaticGateway::calm(), history)
            .predict("downtown", ts, 0)
            .await;

        assert_eq!(prediction.trend, Trend::Increasing);
    }

    #[tokio::test]
    async fn test_multiple_horizons_order() {
        let predictor = predictor_with(StaticGateway::calm(), Arc::new(HistoryStore::new()));
        let predictions = predictor
            .predict_multiple_horizons("downtown", monday_morning())
            .await;

        let horizons: Vec<u32> = predictions.iter().map(|p| p.time_horizon_hours).collect();
        assert_eq!(horizons, PREDICTION_HORIZONS.to_vec());
    }

    #[test]
    fn test_trend_requires_six_points() {
        assert_eq!(detect_trend(&[10.0, 20.0, 30.0, 40.0, 50.0]), Trend::Stable);
        assert_eq!(
            detect_trend(&[50.0, 50.0, 50.0, 30.0, 30.0, 30.0]),
            Trend::Decreasing
        );
    }

    #[test]
    fn test_population_std_dev() {
        assert_eq!(population_std_dev(&[]), 0.0);
        assert_eq!(population_std_dev(&[5.0, 5.0, 5.0]), 0.0);
        assert!((population_std_dev(&[2.0, 4.0]) - 1.0).abs() < 1e-9);
    }
}
