use axum::{extract::State, Json};
use serde::Deserialize;

use fareflow_shared::PricingRecommendation;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OptimalPriceRequest {
    pub trip_id: String,
    pub base_price: f64,
    /// Per-user fare adjustment in −10..10 percent
    #[serde(default)]
    pub user_history: f64,
}

/// POST /v1/pricing/optimal
/// Bounded price recommendation used to display and anchor a trip price
pub async fn optimal_price(
    State(state): State<AppState>,
    Json(req): Json<OptimalPriceRequest>,
) -> Result<Json<PricingRecommendation>, AppError> {
    if !req.base_price.is_finite() || req.base_price <= 0.0 {
        return Err(AppError::Validation(format!(
            "base_price must be positive, got {}",
            req.base_price
        )));
    }

    let recommendation = state
        .optimizer
        .calculate_for_user(&req.trip_id, req.base_price, req.user_history)
        .await;
    Ok(Json(recommendation))
}
