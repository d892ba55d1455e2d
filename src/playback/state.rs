//! Observable playback state and events.

use serde::{Deserialize, Serialize};

/// Controller state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing started, or reset.
    Idle,
    /// A section is narrating (or between two sections).
    Playing,
    /// Stopped by the user. Only a full restart resumes.
    Paused,
    /// The last section finished.
    Completed,
}

/// Position of a section relative to the current one, for section lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Done,
    Current,
    Upcoming,
}

impl SectionStatus {
    pub fn for_index(index: usize, current: usize) -> Self {
        match index.cmp(&current) {
            std::cmp::Ordering::Less => SectionStatus::Done,
            std::cmp::Ordering::Equal => SectionStatus::Current,
            std::cmp::Ordering::Greater => SectionStatus::Upcoming,
        }
    }
}

/// Read-only view published to the rendering layer.
///
/// Derived from the controller's authoritative state on every change; never
/// read back for control decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub current_section: usize,
    pub section_count: usize,
    pub current_title: Option<String>,
    pub elapsed_secs: f64,
    pub total_duration_secs: f64,
    pub is_playing: bool,
}

impl PlaybackSnapshot {
    /// Progress bar fill, 0.0 to 100.0.
    pub fn progress_percent(&self) -> f64 {
        super::progress::progress_percent(self.elapsed_secs, self.total_duration_secs)
    }
}

/// Notifications emitted by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Started {
        section_count: usize,
    },
    SectionStarted {
        index: usize,
        title: String,
        chunk_count: usize,
    },
    ChunkSpoken {
        section: usize,
        chunk: usize,
    },
    ChunkFailed {
        section: usize,
        chunk: usize,
        message: String,
    },
    /// The watchdog deadline passed before the section's narration finished.
    WatchdogFired {
        section: usize,
    },
    SectionFinished {
        index: usize,
        forced: bool,
    },
    Skipped {
        from: usize,
        to: usize,
    },
    Paused {
        section: usize,
    },
    Reset,
    Completed,
    ScriptReplaced {
        section_count: usize,
    },
}
