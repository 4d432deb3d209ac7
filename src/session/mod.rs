//! Session tracking and detection history.

mod history;
mod tracker;

pub use history::{DetectionHistory, DetectionStats};
pub use tracker::{SessionPhase, SessionTracker};
