//! Builds the narration script from an analysis payload.
//!
//! Pure and deterministic: the same payload always yields the same script,
//! so the caller can rebuild on every payload change. Missing fields fall
//! back to short phrases, so no section is ever built without content.

use super::model::{Script, Section};
use super::source::{Comparison, DocumentAnalysis, Outline, SourceData};
use log::warn;

/// Speaking pace assumed when sizing sections with variable content.
const SPOKEN_WORDS_PER_SECOND: f64 = 3.0;

/// Top-level headings named in the overview before the list is cut off.
const MAX_HEADINGS_NAMED: usize = 5;

const INTRO_SECS: u32 = 4;
const SINGLE_INTRO_SECS: u32 = 5;
const OVERVIEW_SECS: u32 = 5;
const SINGLE_OVERVIEW_SECS: u32 = 10;
const THEMES_SECS: u32 = 6;
const INSIGHTS_SECS: u32 = 8;
const CONCLUSION_SECS: u32 = 4;

const CONCLUSION_TEXT: &str = "This concludes your analysis. Thank you for using our service.";

/// Build the script for the given payload.
pub fn build(source: &SourceData) -> Script {
    let mut sections = match source {
        SourceData::Single { analysis, outline } => single_document_sections(analysis, outline),
        SourceData::Comparison { comparison } => comparison_sections(comparison),
    };
    sections.push(section("Conclusion", CONCLUSION_TEXT.to_string(), CONCLUSION_SECS));

    assemble(sections)
}

/// Every template produces non-blank content; a blank section here is a
/// template bug and yields an empty script.
fn assemble(sections: Vec<Section>) -> Script {
    match Script::new(sections) {
        Ok(script) => script,
        Err(e) => {
            warn!("Built script was rejected, narrating nothing: {e}");
            Script::default()
        }
    }
}

/// Persona-specific phrase describing why the content matters.
pub fn persona_description(persona: Option<&str>) -> &'static str {
    match persona.map(str::trim) {
        Some("student") => "important learning content that builds foundational knowledge",
        Some("business_analyst") => "critical business information for strategic analysis",
        Some("researcher") => "valuable research data that supports empirical findings",
        Some("project_manager") => "essential project information for planning and execution",
        Some("legal_professional") => "relevant legal information for case preparation",
        Some("financial_analyst") => "financial data important for quantitative analysis",
        _ => "significant information relevant to your analysis",
    }
}

fn single_document_sections(analysis: &DocumentAnalysis, outline: &Outline) -> Vec<Section> {
    let mut sections = Vec::with_capacity(4);

    let title = non_blank(outline.title.as_deref())
        .or_else(|| non_blank(analysis.document_info.title.as_deref()))
        .unwrap_or("your document");
    sections.push(section(
        "Introduction",
        format!("Welcome to your document analysis. We're exploring {title}."),
        SINGLE_INTRO_SECS,
    ));

    sections.push(section(
        "Document Overview",
        overview_text(analysis, outline),
        SINGLE_OVERVIEW_SECS,
    ));

    let insights = clean_items(&analysis.insights);
    let keywords = clean_items(&analysis.document_info.keywords);
    if !insights.is_empty() || !keywords.is_empty() {
        let mut parts = Vec::new();
        if !insights.is_empty() {
            let joined: Vec<String> = insights.iter().map(|i| sentence(i)).collect();
            parts.push(format!("Key insights: {}", joined.join(" ")));
        }
        if !keywords.is_empty() {
            parts.push(format!("Key terms include {}.", join_list(&keywords)));
        }
        parts.push(format!(
            "Overall, this is {}.",
            persona_description(analysis.metadata.persona.as_deref())
        ));
        sections.push(section("Key Insights", parts.join(" "), INSIGHTS_SECS));
    }

    sections
}

fn overview_text(analysis: &DocumentAnalysis, outline: &Outline) -> String {
    let heading_count = outline.outline.len();
    let pages = analysis
        .document_info
        .page_count
        .or_else(|| outline.outline.iter().map(|e| e.page).max())
        .filter(|&p| p > 0)
        .unwrap_or(1);

    let mut text = if heading_count == 0 {
        format!(
            "No structured headings were detected across {}.",
            plural(pages as usize, "page")
        )
    } else {
        format!(
            "This document contains {} across {}.",
            plural(heading_count, "main section"),
            plural(pages as usize, "page")
        )
    };

    let headings: Vec<&str> = outline
        .outline
        .iter()
        .filter(|e| e.is_top_level())
        .filter_map(|e| non_blank(Some(&e.text)))
        .take(MAX_HEADINGS_NAMED)
        .collect();
    if !headings.is_empty() {
        text.push_str(&format!(" The main sections cover {}.", join_list(&headings)));
    }

    if let Some(summary) = non_blank(analysis.summary.as_deref()) {
        text.push(' ');
        text.push_str(&sentence(summary));
    }

    text
}

fn comparison_sections(comparison: &Comparison) -> Vec<Section> {
    let mut sections = Vec::with_capacity(4);

    let count = comparison.document_count.max(comparison.documents.len());
    let count_phrase = if count == 0 {
        "multiple".to_string()
    } else {
        count.to_string()
    };
    sections.push(section(
        "Introduction",
        format!(
            "Welcome to your comprehensive document analysis. Today we're analyzing {count_phrase} documents."
        ),
        INTRO_SECS,
    ));

    let mut overview = "We completed a comparative analysis of your documents, identifying key themes and patterns."
        .to_string();
    let documents = clean_items(&comparison.documents);
    if !documents.is_empty() {
        overview.push_str(&format!(" The documents are {}.", join_list(&documents)));
    }
    sections.push(section("Overview", overview, OVERVIEW_SECS));

    let themes = clean_items(&comparison.common_themes);
    if !themes.is_empty() {
        sections.push(section(
            "Common Themes",
            format!("Key themes identified: {}.", join_list(&themes)),
            THEMES_SECS,
        ));
    }

    sections
}

/// Section whose duration is at least `base_secs`, stretched for long content.
fn section(title: &str, content: String, base_secs: u32) -> Section {
    let secs = base_secs.max(estimate_spoken_secs(&content));
    Section::new(title, content, secs)
}

fn estimate_spoken_secs(text: &str) -> u32 {
    let words = text.split_whitespace().count() as f64;
    (words / SPOKEN_WORDS_PER_SECOND).ceil() as u32
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn clean_items(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|i| non_blank(Some(i)))
        .collect()
}

/// Terminate with a period unless the text already ends a sentence.
fn sentence(text: &str) -> String {
    let text = text.trim();
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// "a", "a and b", "a, b and c".
fn join_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
