use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use fareflow_demand::DemandPatterns;
use fareflow_shared::{DemandFactors, DemandPrediction};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub location: String,
    /// Defaults to now
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub horizon_hours: u32,
}

#[derive(Debug, Deserialize)]
pub struct ObservationRequest {
    pub demand: f64,
    pub timestamp: Option<DateTime<Utc>>,
    /// Defaults to a neutral snapshot for the timestamp
    pub factors: Option<DemandFactors>,
}

#[derive(Debug, Deserialize)]
pub struct PatternsRequest {
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// POST /v1/demand/predict
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Json<DemandPrediction> {
    let timestamp = req.timestamp.unwrap_or_else(Utc::now);
    let prediction = state
        .predictor
        .predict(&req.location, timestamp, req.horizon_hours)
        .await;
    Json(prediction)
}

/// GET /v1/demand/horizons/{location}
/// Predictions for the standard 1/6/12/24/72-hour horizons
pub async fn horizons(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Json<Vec<DemandPrediction>> {
    let predictions = state
        .predictor
        .predict_multiple_horizons(&location, Utc::now())
        .await;
    Json(predictions)
}

/// POST /v1/demand/observations
/// Record one demand observation into the bounded history
pub async fn record_observation(
    State(state): State<AppState>,
    Json(req): Json<ObservationRequest>,
) -> Result<StatusCode, AppError> {
    if !(0.0..=100.0).contains(&req.demand) {
        return Err(AppError::Validation(format!(
            "demand must be within 0..100, got {}",
            req.demand
        )));
    }
    let timestamp = req.timestamp.unwrap_or_else(Utc::now);
    let factors = req
        .factors
        .unwrap_or_else(|| DemandFactors::neutral(timestamp));
    state.history.record(req.demand, factors, timestamp);
    Ok(StatusCode::CREATED)
}

/// POST /v1/demand/patterns
pub async fn patterns(
    State(state): State<AppState>,
    Json(req): Json<PatternsRequest>,
) -> Result<Json<DemandPatterns>, AppError> {
    if req.end <= req.start {
        return Err(AppError::Validation(
            "pattern window end must be after start".to_string(),
        ));
    }
    // The history store is per-deployment region, so the location only
    // labels the request
    tracing::debug!(location = %req.location, "analyzing demand patterns");
    Ok(Json(state.analyzer.analyze(req.start, req.end)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_predict_returns_bounded_values() {
        let state = test_state();
        let response = predict(
            State(state),
            Json(PredictRequest {
                location: "downtown".to_string(),
                timestamp: Some(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()),
                horizon_hours: 6,
            }),
        )
        .await;

        assert!((0.0..=100.0).contains(&response.0.predicted_demand));
        assert!((30.0..=95.0).contains(&response.0.confidence));
        assert_eq!(response.0.time_horizon_hours, 6);
    }

    #[tokio::test]
    async fn test_observation_validation() {
        let state = test_state();
        let result = record_observation(
            State(state.clone()),
            Json(ObservationRequest {
                demand: 150.0,
                timestamp: None,
                factors: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let ok = record_observation(
            State(state.clone()),
            Json(ObservationRequest {
                demand: 60.0,
                timestamp: None,
                factors: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(ok, StatusCode::CREATED);
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test]
    async fn test_patterns_rejects_inverted_window() {
        let state = test_state();
        let now = Utc::now();
        let result = patterns(
            State(state),
            Json(PatternsRequest {
                location: "downtown".to_string(),
                start: now,
                end: now,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
