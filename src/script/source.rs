//! Analysis payloads returned by the document backend.
//!
//! Every field is optional on the wire: the backend fills these in
//! progressively and the script builder has to cope with partial data.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Per-document analysis produced for the selected persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentAnalysis {
    pub summary: Option<String>,
    pub metadata: AnalysisMetadata,
    pub document_info: DocumentInfo,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisMetadata {
    pub persona: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub page_count: Option<u32>,
    pub keywords: Vec<String>,
}

/// Heading outline extracted from a PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outline {
    pub title: Option<String>,
    pub outline: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Heading level as reported by the extractor ("H1", "H2", "H3").
    pub level: String,
    pub text: String,
    #[serde(default)]
    pub page: u32,
}

impl OutlineEntry {
    pub fn is_top_level(&self) -> bool {
        self.level.eq_ignore_ascii_case("H1")
    }
}

/// Result of comparing several uploaded documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comparison {
    pub document_count: usize,
    pub documents: Vec<String>,
    pub common_themes: Vec<String>,
}

/// Input to the script builder: one analysed document, or a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SourceData {
    Single {
        #[serde(default)]
        analysis: DocumentAnalysis,
        #[serde(default)]
        outline: Outline,
    },
    Comparison {
        #[serde(default)]
        comparison: Comparison,
    },
}

impl SourceData {
    /// Deserialize a payload from JSON.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
