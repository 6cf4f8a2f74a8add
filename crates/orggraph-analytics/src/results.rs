use chrono::{DateTime, Utc};
use orggraph_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Round a score the way the public payloads report them.
pub(crate) fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub rank: usize,
    pub node_id: NodeId,
    pub name: Option<String>,
    pub score: f64,
}

/// Summary over the *returned* top-N scores, not the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Self {
            mean: round_score(sorted.iter().sum::<f64>() / n as f64),
            median: round_score(median),
            max: sorted[n - 1],
            min: sorted[0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralityResult {
    pub algorithm: String,
    pub node_type: Option<String>,
    pub nodes: Vec<RankedNode>,
    pub summary: ScoreSummary,
    /// Set when the qualifying set was empty; an empty ranking is success.
    pub explanation: Option<String>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub rank: usize,
    pub size: usize,
    pub central_node: NodeId,
    pub density: f64,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityResult {
    pub algorithm: String,
    pub node_type: Option<String>,
    pub communities: Vec<Community>,
    /// Mean of per-community densities: a simplified proxy, not the
    /// standard modularity metric.
    pub modularity_score: f64,
    pub explanation: Option<String>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeBucket {
    pub bucket: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResult {
    pub total_nodes: u64,
    pub total_relationships: u64,
    pub label_distribution: BTreeMap<String, u64>,
    pub relationship_type_distribution: BTreeMap<String, u64>,
    pub density: f64,
    pub average_degree: f64,
    pub median_degree: f64,
    pub max_degree: u64,
    pub min_degree: u64,
    pub degree_histogram: Vec<DegreeBucket>,
    pub highly_connected_count: u64,
    pub isolated_count: u64,
    /// Approximate: derived from a depth-3 reachability probe, so one long
    /// chain can be reported as several components.
    pub connected_components: u64,
    pub clustering_coefficient: f64,
    pub approximate_diameter: u64,
    pub average_path_length: f64,
    pub sample_size: usize,
    pub explanation: String,
    pub computed_at: DateTime<Utc>,
}

impl StatsResult {
    /// Zeroed payload for the empty graph; no further queries were issued.
    pub fn zeroed(explanation: impl Into<String>) -> Self {
        Self {
            total_nodes: 0,
            total_relationships: 0,
            label_distribution: BTreeMap::new(),
            relationship_type_distribution: BTreeMap::new(),
            density: 0.0,
            average_degree: 0.0,
            median_degree: 0.0,
            max_degree: 0,
            min_degree: 0,
            degree_histogram: Vec::new(),
            highly_connected_count: 0,
            isolated_count: 0,
            connected_components: 0,
            clustering_coefficient: 0.0,
            approximate_diameter: 0,
            average_path_length: 0.0,
            sample_size: 0,
            explanation: explanation.into(),
            computed_at: Utc::now(),
        }
    }
}

/// Cached payload: one variant per operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AnalyticsResult {
    Centrality(CentralityResult),
    Community(CommunityResult),
    Stats(StatsResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_over_even_and_odd_counts() {
        let odd = ScoreSummary::from_scores(&[3.0, 1.0, 2.0]);
        assert_eq!(odd.median, 2.0);
        assert_eq!(odd.mean, 2.0);
        assert_eq!(odd.max, 3.0);
        assert_eq!(odd.min, 1.0);

        let even = ScoreSummary::from_scores(&[4.0, 1.0, 2.0, 3.0]);
        assert_eq!(even.median, 2.5);
    }

    #[test]
    fn summary_of_empty_scores_is_zeroed() {
        assert_eq!(ScoreSummary::from_scores(&[]), ScoreSummary::default());
    }

    #[test]
    fn scores_round_to_four_decimals() {
        assert_eq!(round_score(0.123456), 0.1235);
        assert_eq!(round_score(2.0), 2.0);
    }
}
