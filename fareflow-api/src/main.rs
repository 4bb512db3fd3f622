use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fareflow_api::{app, app_config::Config, AppState};
use fareflow_demand::{DemandPredictor, PatternAnalyzer, PredictorConfig};
use fareflow_market::{HistoryStore, SimulatedGateway};
use fareflow_negotiation::{NegotiationManager, SessionConfig};
use fareflow_pricing::{OptimizerConfig, PriceOptimizer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fareflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting FareFlow API on port {}", config.server.port);

    let gateway = Arc::new(match config.gateway.seed {
        Some(seed) => SimulatedGateway::with_seed(seed),
        None => SimulatedGateway::new(),
    });
    let history = Arc::new(HistoryStore::new());

    let gateway_timeout = Duration::from_millis(config.pricing.gateway_timeout_ms);
    let predictor = Arc::new(DemandPredictor::with_config(
        gateway.clone(),
        history.clone(),
        PredictorConfig {
            economic_indicator: config.demand.economic_indicator,
            gateway_timeout,
        },
    ));
    let analyzer = Arc::new(PatternAnalyzer::new(history.clone()));
    let optimizer = Arc::new(PriceOptimizer::with_config(
        gateway.clone(),
        OptimizerConfig {
            gateway_timeout,
            reference_rate_per_km: config.pricing.reference_rate_per_km,
        },
    ));
    let negotiations = Arc::new(NegotiationManager::with_config(
        optimizer.clone(),
        SessionConfig {
            acceptance_probability: config.negotiation.acceptance_probability,
            window_secs: config.negotiation.window_secs,
            ..SessionConfig::default()
        },
    ));

    let state = AppState {
        predictor,
        analyzer,
        optimizer,
        negotiations,
        history,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app(state))
        .await
        .expect("Server error");
}
