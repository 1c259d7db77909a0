//! Canonical-event derivation from free-text market questions.
//!
//! `normalize` is a pure function: the same question and tags always yield
//! the same canonical key, which is what makes clustering idempotent.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Normalized identity of a real-world question. Two markets belong to the
/// same cluster iff their derived keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Broad topic, taken from the first grouping tag when present.
    pub subject: String,
    /// Normalized event phrase.
    pub event: String,
    /// Four-digit year extracted from the question, if any.
    pub year: Option<i32>,
    /// Jurisdiction token extracted from the question, if any.
    pub jurisdiction: Option<String>,
    /// Conditional clause ("by ...", "above ...") extracted from the
    /// question, if any.
    pub condition: Option<String>,
}

impl CanonicalEvent {
    /// Deterministic cluster identifier derived from the key parts.
    pub fn slug(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.subject.is_empty() {
            parts.push(self.subject.clone());
        }
        if !self.event.is_empty() {
            parts.push(self.event.clone());
        }
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if let Some(ref j) = self.jurisdiction {
            parts.push(j.clone());
        }
        if let Some(ref c) = self.condition {
            parts.push(c.clone());
        }
        parts.join(" ").replace(' ', "-")
    }
}

impl fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(19|20)\d{2}$").expect("valid regex"));

/// Phrase variants collapsed to one token so differently-worded questions
/// derive equal keys.
static SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("wins", "win"),
        ("winner", "win"),
        ("won", "win"),
        ("victory", "win"),
        ("defeats", "win"),
        ("beats", "win"),
        ("potus", "president"),
        ("presidential", "president"),
        ("elections", "election"),
        ("vote", "election"),
        ("usa", "us"),
        ("america", "us"),
        ("american", "us"),
        ("britain", "uk"),
        ("british", "uk"),
        ("btc", "bitcoin"),
        ("eth", "ethereum"),
        ("democrats", "democrat"),
        ("dems", "democrat"),
        ("republicans", "republican"),
        ("gop", "republican"),
        ("rates", "rate"),
        ("reaches", "reach"),
        ("hits", "reach"),
        ("exceeds", "exceed"),
        ("surpasses", "exceed"),
    ])
});

/// Filler words carrying no event identity.
static STOPWORDS: &[&str] = &[
    "will", "the", "a", "an", "to", "of", "in", "on", "at", "be", "is", "are", "was", "do",
    "does", "this", "that", "for", "and", "or", "it", "there", "have", "has",
];

/// Tokens recognized as jurisdictions.
static JURISDICTIONS: &[&str] = &[
    "us", "uk", "eu", "california", "texas", "florida", "georgia", "arizona", "canada",
    "germany", "france", "china", "russia", "india", "australia", "brazil", "mexico",
];

/// Tokens that open a conditional clause. Everything from the marker to the
/// end of the question becomes the condition.
static CONDITION_MARKERS: &[&str] = &["by", "above", "below", "before", "over", "under"];

/// Derive the canonical event key for a market question.
///
/// Case-folds, strips punctuation, collapses synonyms, drops filler words,
/// and extracts year / jurisdiction / condition via pattern rules. Pure and
/// deterministic.
pub fn normalize(question: &str, group_tags: &[String]) -> CanonicalEvent {
    let mut tokens = tokenize(question);

    // Year: first four-digit year token, removed from the phrase.
    let mut year = None;
    tokens.retain(|t| {
        if year.is_none() && YEAR_RE.is_match(t) {
            year = t.parse().ok();
            false
        } else {
            true
        }
    });

    // Condition: suffix clause opened by a marker token. The marker must
    // not be the first token, otherwise the whole question would vanish
    // into the condition.
    let mut condition = None;
    if let Some(rel) = tokens
        .iter()
        .skip(1)
        .position(|t| CONDITION_MARKERS.contains(&t.as_str()))
    {
        // clause[0] is the marker itself; the condition is what follows it.
        let clause: Vec<String> = tokens.split_off(rel + 1);
        let body = clean_tokens(&clause[1..]).join(" ");
        if !body.is_empty() {
            condition = Some(body);
        }
    }

    let mut event_tokens = clean_tokens(&tokens);

    // Jurisdiction: first recognized token, removed from the phrase.
    let mut jurisdiction = None;
    event_tokens.retain(|t| {
        if jurisdiction.is_none() && JURISDICTIONS.contains(&t.as_str()) {
            jurisdiction = Some(t.clone());
            false
        } else {
            true
        }
    });

    let subject = group_tags
        .first()
        .map(|t| clean_tokens(&tokenize(t)).join(" "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| event_tokens.first().cloned().unwrap_or_default());

    CanonicalEvent {
        subject,
        event: event_tokens.join(" "),
        year,
        jurisdiction,
        condition,
    }
}

/// Lowercase and split on non-alphanumeric characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Collapse synonyms and drop stopwords.
fn clean_tokens(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| SYNONYMS.get(t.as_str()).map(|s| s.to_string()).unwrap_or_else(|| t.clone()))
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}
