//! Narration script: the ordered sections a podcast session speaks.
//!
//! A script is built once from the backend's analysis payload and never
//! mutated afterwards. Replacing it is the controller's job.

pub mod builder;
pub mod model;
pub mod source;

pub use builder::{build, persona_description};
pub use model::{Script, Section};
pub use source::{
    AnalysisMetadata, Comparison, DocumentAnalysis, DocumentInfo, Outline, OutlineEntry,
    SourceData,
};
