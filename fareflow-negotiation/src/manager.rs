use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use fareflow_pricing::PriceOptimizer;
use fareflow_shared::{round_price, PricingRecommendation};

use crate::session::{
    CompletionHook, NegotiationError, NegotiationSession, OfferOutcome, SessionConfig,
    SessionRole, SessionView,
};

struct SessionEntry {
    session: Arc<Mutex<NegotiationSession>>,
    timer: JoinHandle<()>,
}

/// Owns negotiation sessions and the 1 Hz timers that drive them.
///
/// Sessions share no state with each other; within one session the
/// mutex serializes timer ticks against offer operations. Timers are
/// aborted the moment a session leaves `Active`, so a dangling tick
/// can never touch a settled session.
pub struct NegotiationManager {
    optimizer: Arc<PriceOptimizer>,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    config: SessionConfig,
}

impl NegotiationManager {
    pub fn new(optimizer: Arc<PriceOptimizer>) -> Self {
        Self::with_config(optimizer, SessionConfig::default())
    }

    pub fn with_config(optimizer: Arc<PriceOptimizer>, config: SessionConfig) -> Self {
        Self {
            optimizer,
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Open a session anchored on `original_price`, with advisory
    /// suggestions derived from the optimizer's view of the trip.
    /// `hook` fires exactly once with the settled price.
    pub async fn create_session(
        &self,
        trip_id: &str,
        original_price: f64,
        role: SessionRole,
        hook: CompletionHook,
    ) -> Result<Uuid, NegotiationError> {
        let recommendation = self
            .optimizer
            .calculate_optimal_price(trip_id, original_price)
            .await;
        let suggestions = build_suggestions(&recommendation, original_price);

        let session = NegotiationSession::with_rng(
            trip_id,
            original_price,
            role,
            suggestions,
            hook,
            self.config.clone(),
            StdRng::from_entropy(),
        )?;
        let id = session.id();
        let session = Arc::new(Mutex::new(session));

        let timer = Self::spawn_timer(session.clone());
        self.sessions
            .lock()
            .expect("session registry poisoned")
            .insert(id, SessionEntry { session, timer });

        tracing::info!(session = %id, trip_id, original_price, "negotiation session opened");
        Ok(id)
    }

    fn spawn_timer(session: Arc<Mutex<NegotiationSession>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                let mut guard = session.lock().expect("session lock poisoned");
                guard.tick();
                if guard.status().is_terminal() {
                    break;
                }
            }
        })
    }

    pub fn make_offer(
        &self,
        id: Uuid,
        price: f64,
        by: SessionRole,
    ) -> Result<OfferOutcome, NegotiationError> {
        self.with_session(id, |session| session.make_offer(price, by))
    }

    pub fn accept_current_offer(&self, id: Uuid) -> Result<f64, NegotiationError> {
        self.with_session(id, |session| session.accept_current_offer())
    }

    pub fn reject(&self, id: Uuid) -> Result<(), NegotiationError> {
        self.with_session(id, |session| session.reject())
    }

    /// Early shutdown (trip cancelled): rejects an active session and
    /// cancels its timer. Already-terminal sessions are left as-is.
    pub fn close_session(&self, id: Uuid) -> Result<(), NegotiationError> {
        let sessions = self.sessions.lock().expect("session registry poisoned");
        let entry = sessions.get(&id).ok_or(NegotiationError::NotFound(id))?;
        let mut session = entry.session.lock().expect("session lock poisoned");
        if !session.status().is_terminal() {
            session.reject()?;
        }
        entry.timer.abort();
        Ok(())
    }

    pub fn view(&self, id: Uuid) -> Result<SessionView, NegotiationError> {
        let sessions = self.sessions.lock().expect("session registry poisoned");
        let entry = sessions.get(&id).ok_or(NegotiationError::NotFound(id))?;
        let session = entry.session.lock().expect("session lock poisoned");
        Ok(session.view())
    }

    pub fn active_count(&self) -> usize {
        let sessions = self.sessions.lock().expect("session registry poisoned");
        sessions
            .values()
            .filter(|e| {
                !e.session
                    .lock()
                    .expect("session lock poisoned")
                    .status()
                    .is_terminal()
            })
            .count()
    }

    /// Drop terminal sessions from the registry, returning how many
    /// were removed.
    pub fn cleanup_settled(&self) -> usize {
        let mut sessions = self.sessions.lock().expect("session registry poisoned");
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let terminal = entry
                .session
                .lock()
                .expect("session lock poisoned")
                .status()
                .is_terminal();
            if terminal {
                entry.timer.abort();
            }
            !terminal
        });
        before - sessions.len()
    }

    fn with_session<T>(
        &self,
        id: Uuid,
        op: impl FnOnce(&mut NegotiationSession) -> Result<T, NegotiationError>,
    ) -> Result<T, NegotiationError> {
        let sessions = self.sessions.lock().expect("session registry poisoned");
        let entry = sessions.get(&id).ok_or(NegotiationError::NotFound(id))?;
        let mut session = entry.session.lock().expect("session lock poisoned");
        let result = op(&mut session);
        if session.status().is_terminal() {
            tracing::info!(
                session = %id,
                status = ?session.status(),
                elapsed_secs = session.elapsed().num_seconds(),
                "negotiation settled"
            );
            entry.timer.abort();
        }
        result
    }
}

fn build_suggestions(recommendation: &PricingRecommendation, original_price: f64) -> Vec<String> {
    let mut suggestions = Vec::new();
    let market = recommendation.recommended_price;
    if market > original_price * 1.05 {
        suggestions.push(format!(
            "Market rate is around {:.2}; there is room to hold firm",
            market
        ));
    } else if market < original_price * 0.95 {
        suggestions.push(format!(
            "Market rate is around {:.2}; expect pressure to settle lower",
            market
        ));
    } else {
        suggestions.push(format!(
            "Quoted price is close to the market rate of {:.2}",
            market
        ));
    }
    suggestions.push(format!(
        "A fair settle range is {:.2} to {:.2}",
        round_price(original_price * 0.9),
        round_price(original_price * 1.1)
    ));
    if !recommendation.reason.is_empty() {
        suggestions.push(recommendation.reason.clone());
    }
    suggestions
}
