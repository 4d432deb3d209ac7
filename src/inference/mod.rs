//! Frame preprocessing and the forward pass.

mod engine;
mod preprocess;

pub use engine::{RawPrediction, predict};
pub use preprocess::{Frame, preprocess};
