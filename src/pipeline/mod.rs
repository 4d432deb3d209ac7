//! Frame analysis pipeline: per-session context, detector facade, input
//! discovery and the live monitoring loop.

mod context;
mod detector;
mod inputs;
mod monitor;

pub use context::PipelineContext;
pub use detector::{Detector, DetectorOptions};
pub use inputs::{collect_image_files, is_image_file};
pub use monitor::{
    CycleGate, CycleGuard, DirectoryFrameSource, FrameSource, Monitor, MonitorEvent,
    MonitorHandle, MonitorSummary,
};
