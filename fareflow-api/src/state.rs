use std::sync::Arc;

use fareflow_demand::{DemandPredictor, PatternAnalyzer};
use fareflow_market::HistoryStore;
use fareflow_negotiation::NegotiationManager;
use fareflow_pricing::PriceOptimizer;

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<DemandPredictor>,
    pub analyzer: Arc<PatternAnalyzer>,
    pub optimizer: Arc<PriceOptimizer>,
    pub negotiations: Arc<NegotiationManager>,
    pub history: Arc<HistoryStore>,
}
