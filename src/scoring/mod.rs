//! Opportunity scoring and human-feedback adjustment.

pub mod feedback;
pub mod scorer;

pub use feedback::{FeedbackExample, FeedbackStore, InMemoryFeedbackStore};
pub use scorer::{expected_profit, score_cluster, Confidence, MarketPair};
