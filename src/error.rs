//! Error types for narrator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarratorError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Script source errors
    #[error("Failed to parse analysis payload: {0}")]
    SourceParse(#[from] serde_json::Error),

    #[error("Script has no sections")]
    EmptyScript,

    #[error("Section '{title}' has no speakable content")]
    EmptySection { title: String },

    // Narration engine errors
    #[error("Narration engine not found: {engine}")]
    EngineNotFound { engine: String },

    #[error("Narration failed: {message}")]
    NarrationFailed { message: String },

    #[error("Narration cancelled")]
    NarrationCancelled,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, NarratorError>;
