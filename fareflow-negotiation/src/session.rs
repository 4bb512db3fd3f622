use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fareflow_shared::{round_price, NegotiationOffer, NegotiationStatus, OfferParty};

/// Probability that an in-window offer is accepted outright.
/// Placeholder heuristic pending a real bargaining model; tune via
/// `SessionConfig`, do not hard-code elsewhere.
pub const ACCEPTANCE_PROBABILITY: f64 = 0.7;
/// Counter-offer step applied to a counterparty offer.
pub const COUNTER_STEP_UP: f64 = 1.05;
/// Counter-offer step applied to a proposer offer.
pub const COUNTER_STEP_DOWN: f64 = 0.95;
/// Wall-clock bargaining window, in seconds.
pub const NEGOTIATION_WINDOW_SECS: u32 = 300;

const PROPOSER_FLEXIBILITY: f64 = 1.1;
const COUNTERPARTY_FLEXIBILITY: f64 = 1.0;

/// Which seat the session creator occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionRole {
    /// Offers the ride and wants a higher settle price
    Proposer,
    /// Takes the ride and wants a lower settle price
    Counterparty,
}

impl SessionRole {
    pub fn opposing(self) -> Self {
        match self {
            SessionRole::Proposer => SessionRole::Counterparty,
            SessionRole::Counterparty => SessionRole::Proposer,
        }
    }

    fn flexibility(self) -> f64 {
        match self {
            SessionRole::Proposer => PROPOSER_FLEXIBILITY,
            SessionRole::Counterparty => COUNTERPARTY_FLEXIBILITY,
        }
    }
}

impl From<SessionRole> for OfferParty {
    fn from(role: SessionRole) -> Self {
        match role {
            SessionRole::Proposer => OfferParty::Proposer,
            SessionRole::Counterparty => OfferParty::Counterparty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub acceptance_probability: f64,
    pub counter_step_up: f64,
    pub counter_step_down: f64,
    pub window_secs: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            acceptance_probability: ACCEPTANCE_PROBABILITY,
            counter_step_up: COUNTER_STEP_UP,
            counter_step_down: COUNTER_STEP_DOWN,
            window_secs: NEGOTIATION_WINDOW_SECS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Session is no longer active (status {0:?})")]
    NotActive(NegotiationStatus),

    #[error("Invalid offer price: {0}")]
    InvalidPrice(f64),
}

/// What `make_offer` did with the offer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfferOutcome {
    /// Offer accepted; session settled at this price
    Accepted(f64),
    /// Counter-offer generated; session still active at this price
    Countered(f64),
}

/// Invoked exactly once, on the first transition out of `Active`,
/// with the settled price and whether it was accepted.
pub type CompletionHook = Box<dyn FnOnce(f64, bool) + Send>;

/// Serializable snapshot of a session for callers and dashboards
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub trip_id: String,
    pub role: SessionRole,
    pub status: NegotiationStatus,
    pub current_offer: f64,
    pub original_price: f64,
    pub min_acceptable: f64,
    pub max_acceptable: f64,
    pub time_remaining_secs: u32,
    pub offers: Vec<NegotiationOffer>,
    pub suggestions: Vec<String>,
}

/// Time-boxed bargaining state machine for one trip price.
///
/// Pure domain logic: the 1 Hz clock is external (`tick()` is driven
/// by the manager's timer task or directly by tests), and the
/// acceptance draw comes from an owned, seedable RNG.
pub struct NegotiationSession {
    id: Uuid,
    trip_id: String,
    role: SessionRole,
    status: NegotiationStatus,
    original_price: f64,
    current_offer: f64,
    min_acceptable: f64,
    max_acceptable: f64,
    time_remaining: u32,
    offers: Vec<NegotiationOffer>,
    suggestions: Vec<String>,
    config: SessionConfig,
    rng: StdRng,
    hook: Option<CompletionHook>,
    started_at: DateTime<Utc>,
}

impl NegotiationSession {
    pub fn new(
        trip_id: impl Into<String>,
        original_price: f64,
        role: SessionRole,
        suggestions: Vec<String>,
        hook: CompletionHook,
    ) -> Result<Self, NegotiationError> {
        Self::with_rng(
            trip_id,
            original_price,
            role,
            suggestions,
            hook,
            SessionConfig::default(),
            StdRng::from_entropy(),
        )
    }

    pub fn with_rng(
        trip_id: impl Into<String>,
        original_price: f64,
        role: SessionRole,
        suggestions: Vec<String>,
        hook: CompletionHook,
        config: SessionConfig,
        rng: StdRng,
    ) -> Result<Self, NegotiationError> {
        if !original_price.is_finite() || original_price <= 0.0 {
            return Err(NegotiationError::InvalidPrice(original_price));
        }

        let flexibility = role.flexibility();
        let min_acceptable = round_price(original_price * flexibility * 0.8);
        let max_acceptable = round_price(original_price * flexibility * 1.2);

        let mut anchor =
            NegotiationOffer::new(original_price, OfferParty::System, "Quoted trip price", 90.0);
        anchor.counter_offer = false;

        Ok(Self {
            id: Uuid::new_v4(),
            trip_id: trip_id.into(),
            role,
            status: NegotiationStatus::Active,
            original_price,
            current_offer: original_price,
            min_acceptable,
            max_acceptable,
            time_remaining: config.window_secs,
            offers: vec![anchor],
            suggestions,
            config,
            rng,
            hook: Some(hook),
            started_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> NegotiationStatus {
        self.status
    }

    pub fn current_offer(&self) -> f64 {
        self.current_offer
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_acceptable, self.max_acceptable)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            trip_id: self.trip_id.clone(),
            role: self.role,
            status: self.status,
            current_offer: self.current_offer,
            original_price: self.original_price,
            min_acceptable: self.min_acceptable,
            max_acceptable: self.max_acceptable,
            time_remaining_secs: self.time_remaining,
            offers: self.offers.clone(),
            suggestions: self.suggestions.clone(),
        }
    }

    /// Advance the wall clock by one second. A no-op once terminal;
    /// reaching zero expires the session.
    pub fn tick(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            tracing::info!(session = %self.id, "negotiation window elapsed");
            self.finalize(NegotiationStatus::Expired, false);
        }
    }

    /// Submit a manual offer from one party.
    ///
    /// An offer inside the acceptable window settles the session with
    /// probability `acceptance_probability`; anything else draws a
    /// counter-offer from the opposing party and the session stays
    /// active.
    pub fn make_offer(
        &mut self,
        price: f64,
        by: SessionRole,
    ) -> Result<OfferOutcome, NegotiationError> {
        if self.status.is_terminal() {
            return Err(NegotiationError::NotActive(self.status));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(NegotiationError::InvalidPrice(price));
        }

        // Each side is bounded by the end of the window it is pushing
        // against; either way the offer must land inside [min, max].
        let acceptable = match by {
            SessionRole::Proposer => {
                price <= self.max_acceptable && price >= self.min_acceptable
            }
            SessionRole::Counterparty => {
                price >= self.min_acceptable && price <= self.max_acceptable
            }
        };

        if acceptable && self.rng.gen_bool(self.config.acceptance_probability) {
            let mut offer = NegotiationOffer::new(price, by.into(), "Offer accepted", 85.0);
            offer.accepted = true;
            self.offers.push(offer);
            self.current_offer = price;
            self.finalize(NegotiationStatus::Accepted, true);
            return Ok(OfferOutcome::Accepted(price));
        }

        let step = match by {
            SessionRole::Counterparty => self.config.counter_step_up,
            SessionRole::Proposer => self.config.counter_step_down,
        };
        let counter = round_price(
            (price * step).clamp(self.min_acceptable, self.max_acceptable),
        );

        let mut offer = NegotiationOffer::new(
            counter,
            by.opposing().into(),
            "Counter-offer within the acceptable range",
            70.0,
        );
        offer.counter_offer = true;
        self.offers.push(offer);
        self.current_offer = counter;

        tracing::debug!(
            session = %self.id,
            offered = price,
            counter,
            "offer countered"
        );
        Ok(OfferOutcome::Countered(counter))
    }

    /// Settle at whatever the current offer is.
    pub fn accept_current_offer(&mut self) -> Result<f64, NegotiationError> {
        if self.status.is_terminal() {
            return Err(NegotiationError::NotActive(self.status));
        }
        let price = self.current_offer;
        self.finalize(NegotiationStatus::Accepted, true);
        Ok(price)
    }

    /// Walk away; the completion hook reports the last standing offer
    /// as not accepted.
    pub fn reject(&mut self) -> Result<(), NegotiationError> {
        if self.status.is_terminal() {
            return Err(NegotiationError::NotActive(self.status));
        }
        self.finalize(NegotiationStatus::Rejected, false);
        Ok(())
    }

    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    fn finalize(&mut self, status: NegotiationStatus, accepted: bool) {
        debug_assert!(status.is_terminal());
        self.status = status;
        // Taking the hook makes the exactly-once guarantee structural
        if let Some(hook) = self.hook.take() {
            hook(self.current_offer, accepted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Outcome = Arc<Mutex<Option<(f64, bool)>>>;

    fn hook() -> (CompletionHook, Outcome, Arc<AtomicUsize>) {
        let outcome: Outcome = Arc::new(Mutex::new(None));
        let fires = Arc::new(AtomicUsize::new(0));
        let (o, f) = (outcome.clone(), fires.clone());
        let hook: CompletionHook = Box::new(move |price, accepted| {
            *o.lock().unwrap() = Some((price, accepted));
            f.fetch_add(1, Ordering::SeqCst);
        });
        (hook, outcome, fires)
    }

    fn counterparty_session(acceptance: f64) -> (NegotiationSession, Outcome, Arc<AtomicUsize>) {
        let (hook, outcome, fires) = hook();
        let config = SessionConfig {
            acceptance_probability: acceptance,
            ..SessionConfig::default()
        };
        let session = NegotiationSession::with_rng(
            "trip-1",
            50.0,
            SessionRole::Counterparty,
            vec![],
            hook,
            config,
            StdRng::seed_from_u64(42),
        )
        .unwrap();
        (session, outcome, fires)
    }

    #[test]
    fn test_counterparty_window_is_anchor_pm_20pct() {
        let (session, _, _) = counterparty_session(0.7);
        assert_eq!(session.bounds(), (40.0, 60.0));
        assert_eq!(session.current_offer(), 50.0);
        assert_eq!(session.time_remaining(), NEGOTIATION_WINDOW_SECS);
        // Seeded with the quoted price as a system offer
        assert_eq!(session.view().role, SessionRole::Counterparty);
        assert_eq!(session.view().offers.len(), 1);
        assert_eq!(session.view().offers[0].party, OfferParty::System);
    }

    #[test]
    fn test_in_window_offer_accepted_under_forced_draw() {
        // Scenario: counterparty offers 45 against a [40, 60] window
        let (mut session, outcome, fires) = counterparty_session(1.0);

        let result = session.make_offer(45.0, SessionRole::Counterparty).unwrap();
        assert_eq!(result, OfferOutcome::Accepted(45.0));
        assert_eq!(session.status(), NegotiationStatus::Accepted);
        assert_eq!(session.current_offer(), 45.0);
        assert_eq!(*outcome.lock().unwrap(), Some((45.0, true)));
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_out_of_window_offer_draws_counter() {
        // Scenario: 70 is above the 60 ceiling, so the proposer side
        // counters and the session stays live
        let (mut session, outcome, _) = counterparty_session(1.0);

        let result = session.make_offer(70.0, SessionRole::Counterparty).unwrap();
        match result {
            OfferOutcome::Countered(counter) => {
                assert!((40.0..=60.0).contains(&counter));
                assert_eq!(session.current_offer(), counter);
            }
            other => panic!("expected counter, got {:?}", other),
        }
        assert_eq!(session.status(), NegotiationStatus::Active);
        assert!(outcome.lock().unwrap().is_none());

        let last = session.view().offers.last().cloned().unwrap();
        assert_eq!(last.party, OfferParty::Proposer);
        assert!(last.counter_offer);
    }

    #[test]
    fn test_counter_offers_always_inside_bounds() {
        let (mut session, _, _) = counterparty_session(0.0);
        for price in [0.01, 1.0, 39.0, 61.0, 500.0, 1.0e9] {
            session.make_offer(price, SessionRole::Counterparty).unwrap();
            let (min, max) = session.bounds();
            assert!(session.current_offer() >= min && session.current_offer() <= max);
        }
    }

    #[test]
    fn test_expiry_after_full_window() {
        let (mut session, outcome, fires) = counterparty_session(0.7);
        for _ in 0..NEGOTIATION_WINDOW_SECS {
            session.tick();
        }
        assert_eq!(session.status(), NegotiationStatus::Expired);
        assert_eq!(*outcome.lock().unwrap(), Some((50.0, false)));

        // Further ticks and offers are no-ops on a terminal session,
        // and the hook never fires a second time
        for _ in 0..100 {
            session.tick();
        }
        assert!(session.make_offer(45.0, SessionRole::Counterparty).is_err());
        assert!(session.accept_current_offer().is_err());
        assert!(session.reject().is_err());
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_accept_current_offer_settles() {
        let (mut session, outcome, _) = counterparty_session(0.0);
        session.make_offer(42.0, SessionRole::Counterparty).unwrap();
        let counter = session.current_offer();

        let settled = session.accept_current_offer().unwrap();
        assert_eq!(settled, counter);
        assert_eq!(session.status(), NegotiationStatus::Accepted);
        assert_eq!(*outcome.lock().unwrap(), Some((counter, true)));
        assert!(session.elapsed().num_milliseconds() >= 0);
    }

    #[test]
    fn test_reject_reports_not_accepted() {
        let (mut session, outcome, _) = counterparty_session(0.7);
        session.reject().unwrap();
        assert_eq!(session.status(), NegotiationStatus::Rejected);
        assert_eq!(*outcome.lock().unwrap(), Some((50.0, false)));
    }

    #[test]
    fn test_seeded_sessions_agree() {
        let run = || {
            let (hook, _, _) = hook();
            let mut session = NegotiationSession::with_rng(
                "trip-1",
                50.0,
                SessionRole::Counterparty,
                vec![],
                hook,
                SessionConfig::default(),
                StdRng::seed_from_u64(7),
            )
            .unwrap();
            let _ = session.make_offer(45.0, SessionRole::Counterparty);
            (session.status(), session.current_offer())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_proposer_window_stretches_upward() {
        let (hook, _, _) = hook();
        let session = NegotiationSession::new("trip-1", 50.0, SessionRole::Proposer, vec![], hook)
            .unwrap();
        assert_eq!(session.bounds(), (44.0, 66.0));
    }

    #[test]
    fn test_rejects_non_positive_anchor() {
        let (hook, _, _) = hook();
        assert!(
            NegotiationSession::new("trip-1", 0.0, SessionRole::Proposer, vec![], hook).is_err()
        );
    }
}
