//! Default configuration constants for narrator.
//!
//! Shared by the config layer, the chunker and the playback controller so the
//! scheduler timings stay consistent everywhere.

/// Maximum number of characters handed to the narration engine in one chunk.
///
/// Browser and command-line speech engines both misbehave on very long
/// utterances; 250 characters is roughly two spoken sentences.
pub const MAX_CHUNK_CHARS: usize = 250;

/// Extra time past a section's nominal duration before the watchdog forces
/// advancement to the next section.
pub const GRACE_PERIOD_MS: u64 = 2000;

/// Pause inserted between naturally completed sections.
pub const INTER_SECTION_PAUSE_MS: u64 = 300;

/// Interval of the progress poll that feeds the progress bar.
pub const PROGRESS_INTERVAL_MS: u64 = 300;

/// Default speaking rate multiplier.
pub const VOICE_RATE: f32 = 1.1;

/// Default voice pitch multiplier.
pub const VOICE_PITCH: f32 = 1.0;

/// Default output volume (0.0 to 1.0).
pub const VOICE_VOLUME: f32 = 1.0;

/// Default external speech command.
pub const ENGINE_COMMAND: &str = "espeak-ng";

/// Nominal words per minute used by the print engine to pace its output.
pub const PRINT_WORDS_PER_MINUTE: u32 = 160;

/// Event channel capacity for playback subscribers.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Words-per-minute an `espeak-ng` voice speaks at rate 1.0.
pub const ESPEAK_BASE_WPM: f32 = 175.0;
