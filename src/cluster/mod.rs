//! Canonical-event clustering: normalization, similarity and grouping.

pub mod clusterer;
pub mod normalize;
pub mod similarity;

pub use clusterer::{cluster_markets, ClusterResult, LOW_CONFIDENCE};
pub use normalize::{normalize, CanonicalEvent};
pub use similarity::{jaccard, pair_similarity};
