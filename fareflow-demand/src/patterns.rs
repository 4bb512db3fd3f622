use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use fareflow_market::HistoryStore;

use crate::predictor::population_std_dev;

/// Minimum observations in the window before anomaly detection runs.
const MIN_OBSERVATIONS_FOR_ANOMALIES: usize = 10;

/// Observations more than this many standard deviations from the
/// window mean are flagged.
const ANOMALY_SIGMA: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyDemand {
    pub hour: u32,
    pub average_demand: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDemand {
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub average_demand: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyDemand {
    /// 1–12
    pub month: u32,
    pub average_demand: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandAnomaly {
    pub timestamp: DateTime<Utc>,
    pub demand: f64,
    pub explanation: String,
}

/// Offline pattern summary over a historical window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandPatterns {
    /// Top 3 hours by average demand
    pub peak_hours: Vec<HourlyDemand>,
    /// Top 2 days by average demand
    pub peak_days: Vec<DailyDemand>,
    /// Per-month averages across the window
    pub seasonal_trends: Vec<MonthlyDemand>,
    pub anomalies: Vec<DemandAnomaly>,
}

/// Summarizes recorded observations into peak-hour/day, seasonal and
/// anomaly views for dashboards.
pub struct PatternAnalyzer {
    history: Arc<HistoryStore>,
}

impl PatternAnalyzer {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self { history }
    }

    pub fn analyze(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DemandPatterns {
        let window = self.history.query(start, end);

        let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for obs in &window {
            by_hour.entry(obs.timestamp.hour()).or_default().push(obs.demand);
            by_day
                .entry(obs.timestamp.weekday().num_days_from_monday())
                .or_default()
                .push(obs.demand);
            by_month.entry(obs.timestamp.month()).or_default().push(obs.demand);
        }

        let mut peak_hours: Vec<HourlyDemand> = by_hour
            .iter()
            .map(|(hour, demands)| HourlyDemand {
                hour: *hour,
                average_demand: mean(demands),
            })
            .collect();
        peak_hours.sort_by(|a, b| {
            b.average_demand
                .partial_cmp(&a.average_demand)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        peak_hours.truncate(3);

        let mut peak_days: Vec<DailyDemand> = by_day
            .iter()
            .map(|(day, demands)| DailyDemand {
                day_of_week: *day,
                average_demand: mean(demands),
            })
            .collect();
        peak_days.sort_by(|a, b| {
            b.average_demand
                .partial_cmp(&a.average_demand)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        peak_days.truncate(2);

        let seasonal_trends = by_month
            .iter()
            .map(|(month, demands)| MonthlyDemand {
                month: *month,
                average_demand: mean(demands),
            })
            .collect();

        let anomalies = if window.len() < MIN_OBSERVATIONS_FOR_ANOMALIES {
            Vec::new()
        } else {
            let demands: Vec<f64> = window.iter().map(|o| o.demand).collect();
            let window_mean = mean(&demands);
            let sigma = population_std_dev(&demands);
            window
                .iter()
                .filter(|o| sigma > 0.0 && (o.demand - window_mean).abs() > ANOMALY_SIGMA * sigma)
                .map(|o| DemandAnomaly {
                    timestamp: o.timestamp,
                    demand: o.demand,
                    explanation: explain_anomaly(o.demand, window_mean),
                })
                .collect()
        };

        DemandPatterns {
            peak_hours,
            peak_days,
            seasonal_trends,
            anomalies,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn explain_anomaly(demand: f64, window_mean: f64) -> String {
    if demand > window_mean {
        format!(
            "Demand spike: {:.1} against a window average of {:.1}, likely an unmodelled event",
            demand, window_mean
        )
    } else {
        format!(
            "Demand trough: {:.1} against a window average of {:.1}, likely a service disruption",
            demand, window_mean
        )
    }
}
