pub mod cadence;
pub mod controller;
pub mod loop_worker;

pub use cadence::AdaptiveScheduler;
pub use controller::SamplerController;
