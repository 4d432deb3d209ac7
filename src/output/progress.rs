//! Progress bar for model loading.

use crate::model::LoadProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar for detector initialization.
pub fn create_init_progress(enabled: bool) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Apply a load report to a progress bar.
pub fn apply_progress(pb: Option<&ProgressBar>, progress: &LoadProgress) {
    if let Some(pb) = pb {
        pb.set_position(u64::from(progress.percentage));
        pb.set_message(progress.status.clone());
    }
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}
