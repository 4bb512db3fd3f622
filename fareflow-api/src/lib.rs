use axum::{
    http::Method,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod app_config;
pub mod demand;
pub mod error;
pub mod negotiations;
pub mod pricing;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/v1/pricing/optimal", post(pricing::optimal_price))
        .route("/v1/demand/predict", post(demand::predict))
        .route("/v1/demand/horizons/{location}", get(demand::horizons))
        .route("/v1/demand/observations", post(demand::record_observation))
        .route("/v1/demand/patterns", post(demand::patterns))
        .route("/v1/negotiations", post(negotiations::create_session))
        .route("/v1/negotiations/{id}", get(negotiations::get_session))
        .route("/v1/negotiations/{id}", delete(negotiations::close_session))
        .route("/v1/negotiations/{id}/offers", post(negotiations::make_offer))
        .route("/v1/negotiations/{id}/accept", post(negotiations::accept))
        .route("/v1/negotiations/{id}/reject", post(negotiations::reject))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
