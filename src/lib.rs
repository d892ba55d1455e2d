//! narrator - Spoken narration of document analyses
//!
//! Turns a document analysis (or a comparison of several documents) into a
//! short podcast-style script and narrates it section by section through a
//! pluggable text-to-speech engine.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod narration;
#[cfg(feature = "cli")]
pub mod output;
pub mod playback;
pub mod script;

// Core traits
pub use narration::engine::NarrationEngine;

// Engines
pub use narration::{CommandNarrationEngine, MockNarrationEngine, MockUtterance, PrintNarrationEngine};

// Playback
pub use playback::{
    ControllerConfig, PlaybackController, PlaybackEvent, PlaybackSnapshot, PlaybackState,
};

// Script
pub use script::{Script, Section, SourceData};

// Error handling
pub use error::{NarratorError, Result};

// Config
pub use config::{Config, EngineKind};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
