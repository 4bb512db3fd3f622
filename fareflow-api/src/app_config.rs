use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub demand: DemandConfig,
    pub pricing: PricingConfig,
    pub negotiation: NegotiationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Seed for the simulated market gateway; omit for entropy
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemandConfig {
    #[serde(default = "default_economic_indicator")]
    pub economic_indicator: f64,
}

fn default_economic_indicator() -> f64 {
    50.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    pub reference_rate_per_km: f64,
    pub gateway_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NegotiationConfig {
    pub acceptance_probability: f64,
    pub window_secs: u32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("FAREFLOW").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
