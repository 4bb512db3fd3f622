use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::VecDeque;
use std::sync::RwLock;

use fareflow_shared::{DemandFactors, HistoricalObservation};

/// Maximum number of retained observations; oldest are evicted first.
pub const HISTORY_CAPACITY: usize = 1000;

/// Bounded, append-only store of demand observations.
///
/// Shared between the demand predictor and the pattern analyzer via
/// `Arc<HistoryStore>`; readers take a snapshot so concurrent appends
/// never tear a scan.
pub struct HistoryStore {
    observations: RwLock<VecDeque<HistoricalObservation>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record one observation, evicting the oldest entry when full.
    pub fn record(&self, demand: f64, factors: DemandFactors, timestamp: DateTime<Utc>) {
        let mut obs = self.observations.write().expect("history lock poisoned");
        if obs.len() == self.capacity {
            obs.pop_front();
        }
        obs.push_back(HistoricalObservation {
            timestamp,
            demand: demand.clamp(0.0, 100.0),
            factors,
        });
    }

    /// Snapshot of observations with timestamps in `[start, end]`.
    pub fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<HistoricalObservation> {
        let obs = self.observations.read().expect("history lock poisoned");
        obs.iter()
            .filter(|o| o.timestamp >= start && o.timestamp <= end)
            .cloned()
            .collect()
    }

    /// Observations whose hour is within ±2 of `hour` and whose weekday
    /// (0 = Monday) matches exactly. This is the comparison set for
    /// historical demand averaging.
    pub fn matching(&self, hour: u32, weekday: u32) -> Vec<HistoricalObservation> {
        let obs = self.observations.read().expect("history lock poisoned");
        obs.iter()
            .filter(|o| {
                let obs_hour = o.timestamp.hour() as i64;
                let obs_day = o.timestamp.weekday().num_days_from_monday();
                (obs_hour - hour as i64).abs() <= 2 && obs_day == weekday
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observations.read().expect("history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
