pub mod demand;
pub mod market;
pub mod negotiation;
pub mod pricing;
