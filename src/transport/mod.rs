pub mod state;
pub mod tracker;

pub use state::{LinkSnapshot, LinkState, Transport};
pub use tracker::{TransitionOutcome, TransportTracker};
