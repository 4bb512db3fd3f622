use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use fareflow_shared::PricingRecommendation;

use crate::optimizer::PriceOptimizer;

/// How often an active trip's recommendation is recomputed.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Periodically recomputes the recommendation for one active trip.
///
/// The task is cancelled by dropping the monitor or calling `stop`;
/// consumers watch the latest recommendation through `subscribe`.
pub struct PriceMonitor {
    handle: JoinHandle<()>,
    rx: watch::Receiver<Option<PricingRecommendation>>,
}

impl PriceMonitor {
    pub fn spawn(
        optimizer: Arc<PriceOptimizer>,
        trip_id: impl Into<String>,
        base_price: f64,
        interval: Duration,
    ) -> Self {
        let trip_id = trip_id.into();
        let (tx, rx) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let recommendation =
                    optimizer.calculate_optimal_price(&trip_id, base_price).await;
                tracing::debug!(
                    trip_id,
                    price = recommendation.recommended_price,
                    "refreshed trip recommendation"
                );
                if tx.send(Some(recommendation)).is_err() {
                    // No subscribers left
                    break;
                }
            }
        });

        Self { handle, rx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PricingRecommendation>> {
        self.rx.clone()
    }

    pub fn latest(&self) -> Option<PricingRecommendation> {
        self.rx.borrow().clone()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PriceMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
