//! Numbered citation markers (`[1]`, `[2]`, ...) in assistant text.
//!
//! Message content is never rewritten. These helpers only read markers so a
//! view can attach source details next to them.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("citation marker pattern"));

/// A source a numbered marker points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    pub number: u32,
    pub title: String,
    pub url: String,
    pub author: String,
    pub date: String,
}

/// A marker paired with its source, if one is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCitation<'a> {
    pub number: u32,
    pub source: Option<&'a CitationSource>,
}

/// Marker numbers in order of first appearance, without duplicates.
pub fn extract_markers(text: &str) -> Vec<u32> {
    let mut numbers = Vec::new();
    for cap in MARKER.captures_iter(text) {
        let Ok(n) = cap[1].parse::<u32>() else {
            continue;
        };
        if !numbers.contains(&n) {
            numbers.push(n);
        }
    }
    numbers
}

/// Pair every marker in `text` with its entry in `sources`.
pub fn resolve<'a>(text: &str, sources: &'a [CitationSource]) -> Vec<ResolvedCitation<'a>> {
    extract_markers(text)
        .into_iter()
        .map(|number| ResolvedCitation {
            number,
            source: sources.iter().find(|s| s.number == number),
        })
        .collect()
}

/// Sources behind the simulated assistant's cited passage.
pub fn default_sources() -> Vec<CitationSource> {
    vec![
        CitationSource {
            number: 1,
            title: "Artificial Intelligence Basics".into(),
            url: "https://example.com/ai-basics".into(),
            author: "John Smith".into(),
            date: "2023-05-10".into(),
        },
        CitationSource {
            number: 2,
            title: "Machine Learning Fundamentals".into(),
            url: "https://example.com/ml-fundamentals".into(),
            author: "Sarah Johnson".into(),
            date: "2022-11-22".into(),
        },
        CitationSource {
            number: 3,
            title: "Deep Learning Applications".into(),
            url: "https://example.com/deep-learning".into(),
            author: "Michael Chen".into(),
            date: "2024-01-15".into(),
        },
    ]
}
