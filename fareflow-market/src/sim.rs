use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

use fareflow_shared::{MarketSnapshot, TripDetails, WeatherCondition, WeatherReport};

use crate::gateway::{MarketDataGateway, MarketError};

/// Reference fare per kilometre used as the competitor baseline.
pub const REFERENCE_RATE_PER_KM: f64 = 2.5;

/// Gateway backed by a seedable random source.
///
/// Stands in for the real market data backend; tests construct it with
/// `with_seed` so every draw is reproducible.
pub struct SimulatedGateway {
    rng: Mutex<StdRng>,
    trips: Mutex<HashMap<String, TripDetails>>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            trips: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            trips: Mutex::new(HashMap::new()),
        }
    }

    /// Register a known trip; unknown ids get a synthesized default.
    pub fn insert_trip(&self, trip_id: impl Into<String>, trip: TripDetails) {
        self.trips
            .lock()
            .expect("trip lock poisoned")
            .insert(trip_id.into(), trip);
    }

    fn draw(&self, low: f64, high: f64) -> f64 {
        self.rng
            .lock()
            .expect("rng lock poisoned")
            .gen_range(low..high)
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataGateway for SimulatedGateway {
    async fn get_trip_data(&self, trip_id: &str) -> Result<TripDetails, MarketError> {
        if let Some(trip) = self.trips.lock().expect("trip lock poisoned").get(trip_id) {
            return Ok(trip.clone());
        }
        let distance = self.draw(3.0, 40.0);
        Ok(TripDetails {
            from: "downtown".to_string(),
            to: "airport".to_string(),
            distance_km: distance,
            duration_minutes: distance * 1.8,
            departure_time: Utc::now() + Duration::hours(3),
            vehicle_type: "sedan".to_string(),
        })
    }

    async fn get_market_snapshot(&self, _trip_id: &str) -> Result<MarketSnapshot, MarketError> {
        Ok(MarketSnapshot {
            active_trips: self.draw(0.0, 20.0) as u32,
            waiting_passengers: self.draw(0.0, 40.0) as u32,
            available_drivers: self.draw(1.0, 25.0) as u32,
            recent_bookings: self.draw(0.0, 30.0) as u32,
        })
    }

    async fn get_weather_impact(
        &self,
        _location: &str,
        _time: DateTime<Utc>,
    ) -> Result<f64, MarketError> {
        Ok(self.draw(-20.0, 35.0))
    }

    async fn get_weather(
        &self,
        _location: &str,
        _time: DateTime<Utc>,
    ) -> Result<WeatherReport, MarketError> {
        let roll = self.draw(0.0, 1.0);
        let condition = if roll < 0.45 {
            WeatherCondition::Clear
        } else if roll < 0.70 {
            WeatherCondition::Cloudy
        } else if roll < 0.85 {
            WeatherCondition::Rain
        } else if roll < 0.92 {
            WeatherCondition::Fog
        } else if roll < 0.97 {
            WeatherCondition::Snow
        } else {
            WeatherCondition::Storm
        };
        Ok(WeatherReport {
            condition,
            temperature: self.draw(-5.0, 32.0),
        })
    }

    async fn get_event_impact(
        &self,
        _location: &str,
        time: DateTime<Utc>,
    ) -> Result<f64, MarketError> {
        // Evening events are more likely
        let base = if (17..23).contains(&time.hour()) { 25.0 } else { 5.0 };
        Ok((base + self.draw(0.0, 30.0)).min(100.0))
    }

    async fn get_competitor_pricing(&self, trip_id: &str) -> Result<Vec<f64>, MarketError> {
        let trip = self.get_trip_data(trip_id).await?;
        let reference = trip.distance_km * REFERENCE_RATE_PER_KM;
        Ok((0..5)
            .map(|_| reference * self.draw(0.85, 1.25))
            .collect())
    }
}

/// Gateway returning fixed values, for exact-scenario tests and demos.
pub struct StaticGateway {
    pub trip: TripDetails,
    pub snapshot: MarketSnapshot,
    pub weather_impact: f64,
    pub weather: WeatherReport,
    pub event_impact: f64,
    pub competitor_prices: Vec<f64>,
    /// When true, every call reports the backend as unreachable
    pub fail: bool,
}

impl StaticGateway {
    pub fn calm() -> Self {
        Self {
            trip: TripDetails {
                from: "downtown".to_string(),
                to: "airport".to_string(),
                distance_km: 10.0,
                duration_minutes: 18.0,
                departure_time: Utc::now() + Duration::hours(3),
                vehicle_type: "sedan".to_string(),
            },
            snapshot: MarketSnapshot {
                active_trips: 4,
                waiting_passengers: 8,
                available_drivers: 10,
                recent_bookings: 6,
            },
            weather_impact: 0.0,
            weather: WeatherReport {
                condition: WeatherCondition::Clear,
                temperature: 18.0,
            },
            event_impact: 5.0,
            competitor_prices: vec![24.0, 25.0, 26.0, 25.5, 24.5],
            fail: false,
        }
    }
}

#[async_trait]
impl MarketDataGateway for StaticGateway {
    async fn get_trip_data(&self, trip_id: &str) -> Result<TripDetails, MarketError> {
        if self.fail {
            return Err(MarketError::Unavailable(trip_id.to_string()));
        }
        Ok(self.trip.clone())
    }

    async fn get_market_snapshot(&self, trip_id: &str) -> Result<MarketSnapshot, MarketError> {
        if self.fail {
            return Err(MarketError::Unavailable(trip_id.to_string()));
        }
        Ok(self.snapshot)
    }

    async fn get_weather_impact(
        &self,
        location: &str,
        _time: DateTime<Utc>,
    ) -> Result<f64, MarketError> {
        if self.fail {
            return Err(MarketError::Unavailable(location.to_string()));
        }
        Ok(self.weather_impact)
    }

    async fn get_weather(
        &self,
        location: &str,
        _time: DateTime<Utc>,
    ) -> Result<WeatherReport, MarketError> {
        if self.fail {
            return Err(MarketError::Unavailable(location.to_string()));
        }
        Ok(self.weather)
    }

    async fn get_event_impact(
        &self,
        location: &str,
        _time: DateTime<Utc>,
    ) -> Result<f64, MarketError> {
        if self.fail {
            return Err(MarketError::Unavailable(location.to_string()));
        }
        Ok(self.event_impact)
    }

    async fn get_competitor_pricing(&self, trip_id: &str) -> Result<Vec<f64>, MarketError> {
        if self.fail {
            return Err(MarketError::Unavailable(trip_id.to_string()));
        }
        Ok(self.competitor_prices.clone())
    }
}
