use crate::results::{round_score, DegreeBucket, StatsResult};
use crate::sampling::SamplingEngine;
use crate::traverse::AdjacencyCache;
use chrono::Utc;
use orggraph_core::{AnalyticsRequest, NodeId, Result};
use orggraph_graph::TraversalClient;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Cap on the degree-table scan backing the degree summary.
const DEGREE_SCAN_CAP: usize = 5000;
/// Seed cap for the connectivity probe.
const COMPONENT_PROBE_SEEDS: usize = 500;
/// Reachability depth of the connectivity probe; longer chains split.
const COMPONENT_PROBE_DEPTH: usize = 3;
/// How many sampled nodes serve as path-probe starts.
const PATH_SAMPLE_STARTS: usize = 10;
/// Shortest paths probed per start.
const PATHS_PER_START: usize = 10;
/// Depth bound of each path search.
const PATH_SEARCH_DEPTH: usize = 10;

const BUCKET_ORDER: [&str; 7] = [
    "0 (isolated)",
    "1-5",
    "6-10",
    "11-20",
    "21-50",
    "51-100",
    "100+",
];

/// Computes graph-wide statistics in a fixed order, short-circuiting to a
/// zeroed result on an empty graph so no further queries are issued. The
/// clustering coefficient, diameter and average path length are sampled
/// estimates, and the component count comes from a depth-3 reachability
/// probe rather than an exact scan.
#[derive(Clone)]
pub struct GraphStatisticsCollector {
    client: TraversalClient,
    sampling: SamplingEngine,
}

impl GraphStatisticsCollector {
    pub fn new(client: TraversalClient, sampling: SamplingEngine) -> Self {
        Self { client, sampling }
    }

    pub async fn run(&self, request: &AnalyticsRequest) -> Result<StatsResult> {
        let node_type = request.node_type.as_deref();
        let relationship_type = request.relationship_type.as_deref();
        debug!(sample_size = request.sample_size, "collecting graph statistics");

        let total_nodes = self.client.count_nodes(node_type).await?;
        if total_nodes == 0 {
            return Ok(StatsResult::zeroed(
                "The graph contains no qualifying nodes; no further statistics were computed.",
            ));
        }

        let total_relationships = self.client.count_relationships(relationship_type).await?;
        let label_distribution = self.client.label_distribution(node_type).await?;
        let relationship_type_distribution = self
            .client
            .relationship_type_distribution(relationship_type)
            .await?;

        let degree_rows = self.client.degree_table(node_type, DEGREE_SCAN_CAP).await?;
        // Backend order: degree descending.
        let degrees: Vec<u64> = degree_rows.iter().map(|r| r.degree).collect();
        let total_degree: u64 = degrees.iter().sum();
        let n = total_nodes as f64;
        let density = if total_nodes > 1 {
            total_degree as f64 / (n * (n - 1.0))
        } else {
            0.0
        };
        let average_degree = total_degree as f64 / degrees.len() as f64;
        let median_degree = median(&degrees);
        let max_degree = degrees.first().copied().unwrap_or(0);
        let min_degree = degrees.last().copied().unwrap_or(0);
        let degree_histogram = histogram(&degrees);
        let highly_connected_count = above_90th_percentile(&degrees);
        let isolated_count = degrees.iter().filter(|d| **d == 0).count() as u64;

        let connected_components = self.probe_components(node_type).await?;
        let (clustering_coefficient, approximate_diameter, average_path_length, sampled) = self
            .sampled_estimates(node_type, request.sample_size)
            .await?;

        let explanation = build_explanation(
            density,
            clustering_coefficient,
            connected_components,
            total_nodes,
        );

        Ok(StatsResult {
            total_nodes,
            total_relationships,
            label_distribution,
            relationship_type_distribution,
            density: round_score(density),
            average_degree: round_score(average_degree),
            median_degree,
            max_degree,
            min_degree,
            degree_histogram,
            highly_connected_count,
            isolated_count,
            connected_components,
            clustering_coefficient,
            approximate_diameter,
            average_path_length,
            sample_size: sampled,
            explanation,
            computed_at: Utc::now(),
        })
    }

    /// Approximate component count: breadth-first reachability over up to
    /// 500 seeds, stopping at depth 3. Chains longer than 3 hops are
    /// reported as multiple components.
    async fn probe_components(&self, node_type: Option<&str>) -> Result<u64> {
        let seeds = self.client.node_ids(node_type, COMPONENT_PROBE_SEEDS).await?;
        if seeds.is_empty() {
            return Ok(0);
        }
        let fetched = self.client.adjacency(&seeds, None).await?;
        let seed_set: BTreeSet<NodeId> = seeds.iter().cloned().collect();

        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut components = 0u64;
        for seed in &seeds {
            if visited.contains(seed) {
                continue;
            }
            components += 1;
            visited.insert(seed.clone());
            let mut frontier = vec![seed.clone()];
            for _ in 0..COMPONENT_PROBE_DEPTH {
                let mut next = Vec::new();
                for node in &frontier {
                    let Some(neighbors) = fetched.get(node) else {
                        continue;
                    };
                    for neighbor in neighbors {
                        if seed_set.contains(neighbor) && visited.insert(neighbor.clone()) {
                            next.push(neighbor.clone());
                        }
                    }
                }
                if next.is_empty() {
                    break;
                }
                frontier = next;
            }
        }
        Ok(components)
    }

    /// Sampled clustering coefficient (mean local triangle ratio), diameter
    /// (max over probed shortest paths) and average path length (mean over
    /// the same paths).
    async fn sampled_estimates(
        &self,
        node_type: Option<&str>,
        sample_size: usize,
    ) -> Result<(f64, u64, f64, usize)> {
        let sample = self.sampling.sample_node_ids(node_type, sample_size).await?;
        if sample.is_empty() {
            return Ok((0.0, 0, 0.0, 0));
        }

        let adjacency = self.client.adjacency(&sample, None).await?;
        let triangles = self.client.triangle_counts(&sample).await?;
        let mut ratios = Vec::new();
        for id in &sample {
            let k = adjacency.get(id).map(|n| n.len()).unwrap_or(0);
            if k < 2 {
                continue;
            }
            let possible = (k * (k - 1) / 2) as f64;
            let closed = triangles.get(id).copied().unwrap_or(0) as f64;
            ratios.push((closed / possible).min(1.0));
        }
        let clustering = if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };

        let mut cache = AdjacencyCache::new(self.client.clone());
        let mut observed: Vec<u64> = Vec::new();
        for start in sample.iter().take(PATH_SAMPLE_STARTS) {
            let targets: Vec<&NodeId> = sample
                .iter()
                .filter(|t| *t != start)
                .take(PATHS_PER_START)
                .collect();
            if targets.is_empty() {
                break;
            }
            let distances = cache.bfs_distances(start, PATH_SEARCH_DEPTH).await?;
            for target in targets {
                if let Some(distance) = distances.get(target) {
                    observed.push(*distance as u64);
                }
            }
        }
        let diameter = observed.iter().copied().max().unwrap_or(0);
        let average_path = if observed.is_empty() {
            0.0
        } else {
            observed.iter().sum::<u64>() as f64 / observed.len() as f64
        };

        Ok((
            round_score(clustering),
            diameter,
            round_score(average_path),
            sample.len(),
        ))
    }
}

fn median(descending: &[u64]) -> f64 {
    if descending.is_empty() {
        return 0.0;
    }
    let n = descending.len();
    if n % 2 == 1 {
        descending[n / 2] as f64
    } else {
        (descending[n / 2 - 1] + descending[n / 2]) as f64 / 2.0
    }
}

fn degree_bucket(degree: u64) -> &'static str {
    match degree {
        0 => "0 (isolated)",
        1..=5 => "1-5",
        6..=10 => "6-10",
        11..=20 => "11-20",
        21..=50 => "21-50",
        51..=100 => "51-100",
        _ => "100+",
    }
}

fn histogram(degrees: &[u64]) -> Vec<DegreeBucket> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for degree in degrees {
        *counts.entry(degree_bucket(*degree)).or_default() += 1;
    }
    BUCKET_ORDER
        .iter()
        .map(|bucket| DegreeBucket {
            bucket: bucket.to_string(),
            count: counts.get(bucket).copied().unwrap_or(0),
        })
        .collect()
}

/// Count of nodes strictly above the 90th-percentile degree.
fn above_90th_percentile(degrees: &[u64]) -> u64 {
    if degrees.is_empty() {
        return 0;
    }
    let mut ascending = degrees.to_vec();
    ascending.sort_unstable();
    let index = ((ascending.len() - 1) as f64 * 0.9).round() as usize;
    let threshold = ascending[index.min(ascending.len() - 1)];
    degrees.iter().filter(|d| **d > threshold).count() as u64
}

fn build_explanation(
    density: f64,
    clustering: f64,
    components: u64,
    total_nodes: u64,
) -> String {
    let density_desc = if density < 0.01 {
        "very sparse"
    } else if density < 0.1 {
        "sparse"
    } else if density < 0.5 {
        "moderate"
    } else {
        "dense"
    };
    let clustering_desc = if clustering < 0.3 {
        "low"
    } else if clustering < 0.6 {
        "moderate"
    } else {
        "high"
    };
    let fragmentation = if components as f64 > total_nodes as f64 * 0.1 {
        "highly fragmented"
    } else if components > 1 {
        "somewhat fragmented"
    } else {
        "fully connected"
    };
    format!(
        "The graph is {} (density {:.4}) with {} clustering (coefficient {:.4}) and appears {} ({} reachability components across {} nodes).",
        density_desc, density, clustering_desc, clustering, fragmentation, components, total_nodes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use orggraph_core::{EdgeRef, NodeRef};
    use orggraph_graph::MemoryGraph;
    use std::sync::Arc;

    fn collector(graph: MemoryGraph) -> GraphStatisticsCollector {
        let client = TraversalClient::new(Arc::new(graph));
        let sampling = SamplingEngine::with_seed(client.clone(), 7);
        GraphStatisticsCollector::new(client, sampling)
    }

    #[tokio::test]
    async fn empty_graph_short_circuits_to_zeroed_result() {
        let collector = collector(MemoryGraph::new());
        let request = AnalyticsRequest::stats(None, None, 1000);
        let result = collector.run(&request).await.unwrap();

        assert_eq!(result.total_nodes, 0);
        assert_eq!(result.density, 0.0);
        assert_eq!(result.connected_components, 0);
        assert!(result.explanation.contains("no qualifying nodes"));
    }

    #[tokio::test]
    async fn isolated_nodes_and_one_pair() {
        let graph = MemoryGraph::new();
        for id in ["i1", "i2", "i3", "p1", "p2"] {
            graph.add_node(NodeRef::new(id, vec!["Person".into()]));
        }
        graph
            .add_edge(EdgeRef::new("e1", "COLLABORATES_WITH", "p1", "p2"))
            .unwrap();

        let collector = collector(graph);
        let request = AnalyticsRequest::stats(None, None, 100);
        let result = collector.run(&request).await.unwrap();

        assert_eq!(result.total_nodes, 5);
        assert_eq!(result.isolated_count, 3);
        let isolated_bucket = result
            .degree_histogram
            .iter()
            .find(|b| b.bucket == "0 (isolated)")
            .unwrap();
        assert_eq!(isolated_bucket.count, 3);
        let low_bucket = result
            .degree_histogram
            .iter()
            .find(|b| b.bucket == "1-5")
            .unwrap();
        assert_eq!(low_bucket.count, 2);
        assert!(result.connected_components >= 2);
        assert_eq!(result.connected_components, 4);
    }

    #[tokio::test]
    async fn triangle_has_full_clustering_and_unit_paths() {
        let graph = MemoryGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(NodeRef::new(id, vec!["Person".into()]));
        }
        for (edge_id, from, to) in [("e1", "a", "b"), ("e2", "b", "c"), ("e3", "c", "a")] {
            graph
                .add_edge(EdgeRef::new(edge_id, "WORKS_ON", from, to))
                .unwrap();
        }

        let collector = collector(graph);
        let request = AnalyticsRequest::stats(None, None, 10);
        let result = collector.run(&request).await.unwrap();

        assert_eq!(result.clustering_coefficient, 1.0);
        assert_eq!(result.approximate_diameter, 1);
        assert_eq!(result.average_path_length, 1.0);
        assert_eq!(result.connected_components, 1);
        // density: total degree 6 over 3·2 possible
        assert_eq!(result.density, 1.0);
        assert_eq!(result.sample_size, 3);
    }

    #[tokio::test]
    async fn distributions_respect_scope_filters() {
        let graph = MemoryGraph::new();
        graph.add_node(NodeRef::new("p1", vec!["Person".into()]));
        graph.add_node(NodeRef::new("t1", vec!["Team".into()]));
        graph
            .add_edge(EdgeRef::new("e1", "MEMBER_OF", "p1", "t1"))
            .unwrap();

        let collector = collector(graph);
        let request =
            AnalyticsRequest::stats(Some("Person".into()), Some("MEMBER_OF".into()), 10);
        let result = collector.run(&request).await.unwrap();

        assert_eq!(result.total_nodes, 1);
        assert_eq!(result.label_distribution.get("Person"), Some(&1));
        assert_eq!(result.label_distribution.get("Team"), None);
        assert_eq!(
            result.relationship_type_distribution.get("MEMBER_OF"),
            Some(&1)
        );
    }

    #[test]
    fn explanation_thresholds() {
        let text = build_explanation(0.005, 0.1, 1, 100);
        assert!(text.contains("very sparse"));
        assert!(text.contains("low clustering"));
        assert!(text.contains("fully connected"));

        let text = build_explanation(0.2, 0.5, 3, 100);
        assert!(text.contains("moderate (density"));
        assert!(text.contains("moderate clustering"));
        assert!(text.contains("somewhat fragmented"));

        let text = build_explanation(0.7, 0.9, 20, 100);
        assert!(text.contains("dense"));
        assert!(text.contains("high clustering"));
        assert!(text.contains("highly fragmented"));
    }

    #[test]
    fn percentile_and_median_helpers() {
        assert_eq!(median(&[4, 3, 2, 1, 0]), 2.0);
        assert_eq!(median(&[4, 2]), 3.0);
        assert_eq!(median(&[]), 0.0);

        // degrees: one hub clearly above the rest
        let degrees = vec![50, 3, 3, 2, 2, 1, 1, 1, 0, 0];
        assert_eq!(above_90th_percentile(&degrees), 1);
    }

    #[test]
    fn buckets_cover_the_fixed_ranges() {
        assert_eq!(degree_bucket(0), "0 (isolated)");
        assert_eq!(degree_bucket(5), "1-5");
        assert_eq!(degree_bucket(6), "6-10");
        assert_eq!(degree_bucket(100), "51-100");
        assert_eq!(degree_bucket(101), "100+");

        let buckets = histogram(&[0, 1, 7, 200]);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[6].count, 1);
    }
}
