//! Service layer separating I/O and reporting from processing

pub mod fetch;
pub mod io;
pub mod progress;

pub use fetch::ImageFetcher;
pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate, RecordingProgressReporter,
};
