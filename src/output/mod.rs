//! Output format writers.

mod csv;
mod json;
mod progress;
mod text;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use json::JsonLinesWriter;
pub use progress::{apply_progress, create_init_progress, finish_progress};
pub use text::{TextWriter, summary_line};
pub use types::DetectionRecord;
pub use writer::{OutputWriter, create_writer};
