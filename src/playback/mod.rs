//! Section-by-section playback of a narration script.

pub mod controller;
pub mod progress;
pub mod state;

pub use controller::{ControllerConfig, PlaybackController};
pub use progress::{ProgressReporter, format_time, progress_percent};
pub use state::{PlaybackEvent, PlaybackSnapshot, PlaybackState, SectionStatus};
