pub mod monitor;
pub mod optimizer;

pub use monitor::{PriceMonitor, REFRESH_INTERVAL};
pub use optimizer::{OptimizerConfig, PriceOptimizer, BASE_SURGE, MAX_SURGE, MIN_DISCOUNT};
