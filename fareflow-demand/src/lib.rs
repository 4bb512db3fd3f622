pub mod patterns;
pub mod predictor;

pub use patterns::{DemandAnomaly, DemandPatterns, PatternAnalyzer};
pub use predictor::{DemandPredictor, PredictorConfig, PREDICTION_HORIZONS};
