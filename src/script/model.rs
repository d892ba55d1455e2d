use crate::error::{NarratorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One topical block of the narration script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    /// Heuristic spoken length. Drives progress scaling and the watchdog deadline.
    pub nominal_duration_secs: u32,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>, secs: u32) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            nominal_duration_secs: secs,
        }
    }

    pub fn nominal_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.nominal_duration_secs))
    }

    /// True if the content has at least one non-whitespace character.
    pub fn is_speakable(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Ordered, immutable sequence of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    sections: Vec<Section>,
}

impl Script {
    /// Create a script, rejecting sections without speakable content.
    pub fn new(sections: Vec<Section>) -> Result<Self> {
        if let Some(bad) = sections.iter().find(|s| !s.is_speakable()) {
            return Err(NarratorError::EmptySection {
                title: bad.title.clone(),
            });
        }
        Ok(Self { sections })
    }

    /// A script with no sections. Playing it is a no-op.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sum of all nominal section durations, in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.sections
            .iter()
            .map(|s| f64::from(s.nominal_duration_secs))
            .sum()
    }

    /// Nominal time at which section `index` starts.
    pub fn start_offset_secs(&self, index: usize) -> f64 {
        self.sections
            .iter()
            .take(index)
            .map(|s| f64::from(s.nominal_duration_secs))
            .sum()
    }

    /// Whole minutes shown next to the transport controls (rounded up).
    pub fn total_minutes(&self) -> u64 {
        (self.total_duration_secs() / 60.0).ceil() as u64
    }
}
