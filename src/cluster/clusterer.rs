//! Canonical-event clustering of market snapshots.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::market::Market;

use super::normalize::{normalize, CanonicalEvent};
use super::similarity::jaccard;

/// Confidence below which a cluster is surfaced but flagged.
pub const LOW_CONFIDENCE: f64 = 0.5;

/// A group of markets denoting one canonical event. Always holds at least
/// two members; singletons cannot arbitrage and are dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterResult {
    /// Deterministic cluster identifier derived from the canonical key.
    pub cluster_id: String,
    /// The shared canonical event.
    pub canonical_event: CanonicalEvent,
    /// Member snapshots.
    pub markets: Vec<Market>,
    /// Certainty that all members denote one event, in [0, 1].
    pub confidence: f64,
}

impl ClusterResult {
    /// Whether this cluster should be flagged as uncertain.
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE
    }
}

/// Group markets into canonical-event clusters.
///
/// Re-running on an unchanged snapshot set yields identical clusters:
/// normalization is pure and grouping order is fixed by the key ordering.
#[instrument(skip(markets, config), fields(markets = markets.len()))]
pub fn cluster_markets(markets: &[Market], config: &Config) -> Vec<ClusterResult> {
    let mut groups: BTreeMap<CanonicalEvent, Vec<Market>> = BTreeMap::new();
    for market in markets {
        let key = normalize(&market.question, &market.group_tags);
        groups.entry(key).or_default().push(market.clone());
    }

    attach_ambiguous_singletons(&mut groups, config.cluster_similarity_threshold);

    let clusters: Vec<ClusterResult> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(key, members)| {
            let confidence = cluster_confidence(&members, config.over_group_size);
            ClusterResult {
                cluster_id: key.slug(),
                canonical_event: key,
                markets: members,
                confidence,
            }
        })
        .collect();

    debug!(clusters = clusters.len(), "Clustered market snapshots");

    clusters
}

/// Second pass: a singleton whose key is fuzzy-equal to existing multi-member
/// keys attaches to the closest one. On a similarity tie it stays ungrouped
/// rather than guessing.
fn attach_ambiguous_singletons(
    groups: &mut BTreeMap<CanonicalEvent, Vec<Market>>,
    threshold: f64,
) {
    let single_keys: Vec<CanonicalEvent> = groups
        .iter()
        .filter(|(_, members)| members.len() == 1)
        .map(|(key, _)| key.clone())
        .collect();

    let multi_keys: Vec<CanonicalEvent> = groups
        .iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(key, _)| key.clone())
        .collect();

    for single in single_keys {
        let mut best: Option<(&CanonicalEvent, f64)> = None;
        let mut tied = false;

        for candidate in &multi_keys {
            let sim = key_similarity(&single, candidate);
            if sim < threshold {
                continue;
            }
            match best {
                Some((_, best_sim)) if (sim - best_sim).abs() < 1e-9 => tied = true,
                Some((_, best_sim)) if sim > best_sim => {
                    best = Some((candidate, sim));
                    tied = false;
                }
                None => best = Some((candidate, sim)),
                _ => {}
            }
        }

        if let Some((target, _)) = best {
            if !tied {
                if let Some(member) = groups.remove(&single).and_then(|mut v| v.pop()) {
                    groups
                        .entry(target.clone())
                        .or_default()
                        .push(member);
                }
            }
        }
    }
}

/// Fuzzy equality between two canonical keys. Differing years are never
/// the same event.
fn key_similarity(a: &CanonicalEvent, b: &CanonicalEvent) -> f64 {
    if a.year.is_some() && b.year.is_some() && a.year != b.year {
        return 0.0;
    }
    jaccard(
        &format!("{} {}", a.subject, a.event),
        &format!("{} {}", b.subject, b.event),
    )
}

/// Cluster confidence from member-question similarity variance and group
/// size. Uniform pairwise similarity means the grouping is coherent; very
/// large groups risk over-grouping and are penalized.
fn cluster_confidence(markets: &[Market], over_group_size: usize) -> f64 {
    let n = markets.len();
    if n < 2 {
        return 0.0;
    }

    let mut sims = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            sims.push(jaccard(&markets[i].question, &markets[j].question));
        }
    }

    let mean = sims.iter().sum::<f64>() / sims.len() as f64;
    let variance = sims
        .iter()
        .map(|s| (s - mean).powi(2))
        .sum::<f64>()
        / sims.len() as f64;

    let mut confidence = (0.5 + mean / 2.0) * (1.0 - variance);
    if n > over_group_size {
        confidence *= over_group_size as f64 / n as f64;
    }

    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::OutcomeType;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn market(id: &str, question: &str, tags: &[&str]) -> Market {
        Market {
            id: id.to_string(),
            question: question.to_string(),
            probability: dec!(0.50),
            liquidity: Some(dec!(100)),
            volume: None,
            outcome_type: OutcomeType::Binary,
            group_tags: tags.iter().map(|t| t.to_string()).collect(),
            url: None,
        }
    }

    #[test]
    fn equivalent_wordings_cluster_together() {
        let markets = vec![
            market("a", "Will Smith win the 2024 US election?", &["election"]),
            market("b", "Smith wins 2024 election (US)?", &["election"]),
            market("c", "Will it rain in London tomorrow?", &["weather"]),
        ];

        let clusters = cluster_markets(&markets, &Config::default());

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].markets.len(), 2);
        assert_eq!(clusters[0].canonical_event.year, Some(2024));
    }

    #[test]
    fn singletons_are_dropped() {
        let markets = vec![
            market("a", "Will Smith win the 2024 US election?", &[]),
            market("b", "Will it rain in London tomorrow?", &[]),
        ];

        let clusters = cluster_markets(&markets, &Config::default());
        assert!(clusters.is_empty());
    }

    #[test]
    fn clustering_is_idempotent() {
        let markets = vec![
            market("a", "Will Smith win the 2024 US election?", &["election"]),
            market("b", "Smith wins 2024 election (US)?", &["election"]),
            market("c", "Will Bitcoin reach 100k?", &["crypto"]),
            market("d", "BTC hits 100k?", &["crypto"]),
        ];

        let first = cluster_markets(&markets, &Config::default());
        let second = cluster_markets(&markets, &Config::default());

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.cluster_id, b.cluster_id);
            let ids_a: Vec<&str> = a.markets.iter().map(|m| m.id.as_str()).collect();
            let ids_b: Vec<&str> = b.markets.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn every_cluster_has_at_least_two_members() {
        let markets = vec![
            market("a", "Will Smith win the 2024 US election?", &["election"]),
            market("b", "Smith wins 2024 election (US)?", &["election"]),
            market("c", "Will it rain in London tomorrow?", &[]),
            market("d", "Will the Fed cut rates in 2025?", &[]),
        ];

        for cluster in cluster_markets(&markets, &Config::default()) {
            assert!(cluster.markets.len() >= 2);
        }
    }

    #[test]
    fn different_years_never_fuzzy_merge() {
        let a = normalize("Will Smith win the 2024 election?", &[]);
        let b = normalize("Will Smith win the 2028 election?", &[]);
        assert_eq!(key_similarity(&a, &b), 0.0);
    }

    #[test]
    fn oversized_groups_lose_confidence() {
        let small: Vec<Market> = (0..3)
            .map(|i| market(&format!("m{}", i), "Will Smith win the election?", &[]))
            .collect();
        let large: Vec<Market> = (0..20)
            .map(|i| market(&format!("m{}", i), "Will Smith win the election?", &[]))
            .collect();

        let small_conf = cluster_confidence(&small, 8);
        let large_conf = cluster_confidence(&large, 8);
        assert!(large_conf < small_conf);
    }

    #[test]
    fn identical_questions_have_high_confidence() {
        let members = vec![
            market("a", "Will Smith win the election?", &[]),
            market("b", "Will Smith win the election?", &[]),
        ];
        assert!(cluster_confidence(&members, 8) > 0.9);
    }
}
