pub mod manager;
pub mod session;

pub use manager::NegotiationManager;
pub use session::{
    CompletionHook, NegotiationError, NegotiationSession, OfferOutcome, SessionConfig,
    SessionRole, SessionView, ACCEPTANCE_PROBABILITY, NEGOTIATION_WINDOW_SECS,
};
