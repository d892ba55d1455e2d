//! Narration engines and the chunked speaking loop.
//!
//! ```text
//! Section text ──▶ split() ──▶ [chunk, chunk, …] ──▶ speak_sequence() ──▶ NarrationEngine
//!                                                        ▲       │
//!                                                        └───────┘
//!                                              next chunk after done/error
//! ```

pub mod chunker;
pub mod command;
pub mod engine;
pub mod print;

pub use chunker::{ChunkOutcome, SequenceOutcome, speak_sequence, split};
pub use command::CommandNarrationEngine;
pub use engine::{MockNarrationEngine, MockUtterance, NarrationEngine, VoiceSettings};
pub use print::PrintNarrationEngine;
