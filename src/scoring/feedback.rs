//! Human feedback on historical candidate pairs.
//!
//! Labels bias future scoring only; past scan records are never touched.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cluster::pair_similarity;

/// A human label on a historical candidate pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackExample {
    /// Record identifier.
    pub id: String,
    /// First market question as labeled.
    pub market1_question: String,
    /// Second market question as labeled.
    pub market2_question: String,
    /// Whether the human accepted the pair as a real opportunity.
    pub is_valid_opportunity: bool,
    /// Optional free-text reason.
    pub reason: Option<String>,
    /// When the label was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FeedbackExample {
    /// Create a new label for a question pair.
    pub fn new(
        market1_question: impl Into<String>,
        market2_question: impl Into<String>,
        is_valid_opportunity: bool,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            market1_question: market1_question.into(),
            market2_question: market2_question.into(),
            is_valid_opportunity,
            reason,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Store of human feedback labels, consulted by the scorer.
pub trait FeedbackStore: Send + Sync {
    /// Persist a label.
    fn record(&self, example: FeedbackExample);

    /// All stored labels.
    fn all(&self) -> Vec<FeedbackExample>;

    /// Best-matching label for a question pair, if any label's pair
    /// similarity reaches the threshold.
    fn find_similar(&self, q1: &str, q2: &str, threshold: f64) -> Option<FeedbackExample> {
        let mut best: Option<(f64, FeedbackExample)> = None;
        for example in self.all() {
            let sim = pair_similarity(
                q1,
                q2,
                &example.market1_question,
                &example.market2_question,
            );
            if sim < threshold {
                continue;
            }
            if best.as_ref().map(|(s, _)| sim > *s).unwrap_or(true) {
                best = Some((sim, example));
            }
        }
        best.map(|(_, example)| example)
    }
}

/// In-memory feedback store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    examples: DashMap<String, FeedbackExample>,
}

impl InMemoryFeedbackStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for InMemoryFeedbackStore {
    fn record(&self, example: FeedbackExample) {
        self.examples.insert(example.id.clone(), example);
    }

    fn all(&self) -> Vec<FeedbackExample> {
        self.examples.iter().map(|e| e.value().clone()).collect()
    }
}
