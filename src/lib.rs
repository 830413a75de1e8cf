//! Pursuit and evasion in a walled arena: a bouncing target, a pursuer that only reacts to
//! what its noisy detector reports, and running statistics over captures and detections.

pub mod agents;
pub mod config;
pub mod detection;
pub mod error;
pub mod report;
pub mod sim;
pub mod strategy;

pub use agents::{Pursuer, Target};
pub use config::Config;
pub use detection::{DetectionMetrics, Detector, Scores};
pub use error::{Error, Result};
pub use report::PerformanceReport;
pub use sim::{Phase, Simulation};
pub use strategy::Strategy;
