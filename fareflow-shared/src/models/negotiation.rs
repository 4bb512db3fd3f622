use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the bargain an offer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferParty {
    Proposer,
    Counterparty,
    System,
}

/// Negotiation session status. All states other than `Active` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStatus {
    Active,
    Accepted,
    Rejected,
    Expired,
}

impl NegotiationStatus {
    pub fn is_terminal(self) -> bool {
        self != NegotiationStatus::Active
    }
}

/// A single offer in a session's append-only history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationOffer {
    pub id: Uuid,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub party: OfferParty,
    pub reason: String,
    /// 0–100
    pub confidence: f64,
    pub accepted: bool,
    pub counter_offer: bool,
}

impl NegotiationOffer {
    pub fn new(price: f64, party: OfferParty, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            price,
            timestamp: Utc::now(),
            party,
            reason: reason.into(),
            confidence,
            accepted: false,
            counter_offer: false,
        }
    }
}
