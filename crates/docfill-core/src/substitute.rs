//! Placeholder substitution
//!
//! Two strategies:
//! - `Structural`: matches against the paragraph's concatenated text, so tokens
//!   split across runs are found, but a matched paragraph collapses into one
//!   run carrying the first run's formatting.
//! - `FormatPreserving`: replaces tokens inside individual runs only. Runs keep
//!   their boundaries, but a token split across runs is never found.
//!
//! Both walk top-level paragraphs, then every table cell paragraph.

use serde::{Deserialize, Serialize};

use crate::document::{Document, FontRule, Paragraph, Segment, TextRun};
use crate::placeholders::PlaceholderMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    Structural,
    FormatPreserving,
}

/// Replace marker tokens throughout the document
pub fn substitute(
    document: &Document,
    placeholders: &PlaceholderMap,
    mode: SubstitutionMode,
) -> Document {
    match mode {
        SubstitutionMode::Structural => {
            document.map_paragraphs(|p| substitute_structural(p, placeholders))
        }
        SubstitutionMode::FormatPreserving => {
            document.map_paragraphs(|p| substitute_in_runs(p, placeholders))
        }
    }
}

/// Replace over the concatenated text; a matched paragraph becomes one run
pub fn substitute_structural(paragraph: &Paragraph, placeholders: &PlaceholderMap) -> Paragraph {
    let mut text = paragraph.text();
    let mut matched = false;

    for (key, value) in placeholders.iter() {
        if text.contains(key) {
            text = text.replace(key, value);
            matched = true;
        }
    }

    if !matched {
        return paragraph.clone();
    }

    let first = paragraph
        .text_runs()
        .next()
        .map(|run| run.with_text(text.as_str()))
        .unwrap_or_else(|| TextRun::new(text.as_str()));

    Paragraph::new(vec![Segment::Text(first)])
}

/// Replace inside each run independently, keeping run boundaries
pub fn substitute_in_runs(paragraph: &Paragraph, placeholders: &PlaceholderMap) -> Paragraph {
    let segments = paragraph
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Text(run) => Segment::Text(replace_in_run(run, placeholders)),
            other => other.clone(),
        })
        .collect();

    Paragraph::new(segments)
}

fn replace_in_run(run: &TextRun, placeholders: &PlaceholderMap) -> TextRun {
    let mut current = run.clone();

    for (key, value) in placeholders.iter() {
        if current.text().contains(key) {
            current = current
                .with_text(current.text().replace(key, value))
                .with_font(FontRule::InheritParagraphStyle);
        }
    }

    current
}
