pub mod gateway;
pub mod history;
pub mod sim;

pub use gateway::{MarketDataGateway, MarketError, GATEWAY_TIMEOUT};
pub use history::{HistoryStore, HISTORY_CAPACITY};
pub use sim::{SimulatedGateway, StaticGateway, REFERENCE_RATE_PER_KM};
