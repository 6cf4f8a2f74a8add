use crate::results::{round_score, CentralityResult, RankedNode, ScoreSummary};
use crate::traverse::AdjacencyCache;
use chrono::Utc;
use orggraph_core::{AnalyticsRequest, CentralityAlgorithm, NodeId, Result};
use orggraph_graph::TraversalClient;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Candidate cap for the per-node BFS of bounded closeness.
const CLOSENESS_CANDIDATES: usize = 200;
/// Neighborhood bound for closeness scores.
const CLOSENESS_MAX_DEPTH: usize = 3;
/// Candidate cap for the local betweenness proxy.
const BETWEENNESS_CANDIDATES: usize = 200;

type Scored = (NodeId, Option<String>, f64);

/// Ranks nodes by one of four bounded centrality measures. The closeness,
/// betweenness and pagerank variants are deliberate approximations that
/// trade exactness for a worst-case cost independent of graph size; the
/// formulas below are the behavioral contract.
#[derive(Clone)]
pub struct CentralityAnalyzer {
    client: TraversalClient,
}

impl CentralityAnalyzer {
    pub fn new(client: TraversalClient) -> Self {
        Self { client }
    }

    pub async fn run(&self, request: &AnalyticsRequest) -> Result<CentralityResult> {
        let algorithm: CentralityAlgorithm = request.algorithm.parse()?;
        let node_type = request.node_type.as_deref();
        debug!(%algorithm, limit = request.limit, "running centrality analysis");

        let scored = match algorithm {
            CentralityAlgorithm::Degree => self.degree(node_type, request.limit).await?,
            CentralityAlgorithm::Closeness => self.closeness(node_type, request.limit).await?,
            CentralityAlgorithm::Betweenness => self.betweenness(node_type, request.limit).await?,
            CentralityAlgorithm::Pagerank => self.pagerank(node_type, request.limit).await?,
        };

        let nodes: Vec<RankedNode> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (node_id, name, score))| RankedNode {
                rank: i + 1,
                node_id,
                name,
                score: round_score(score),
            })
            .collect();
        let scores: Vec<f64> = nodes.iter().map(|n| n.score).collect();
        let explanation = nodes
            .is_empty()
            .then(|| "No nodes matched the requested scope; nothing to rank.".to_string());

        Ok(CentralityResult {
            algorithm: algorithm.to_string(),
            node_type: request.node_type.clone(),
            nodes,
            // Summary covers the returned top-N only, not the whole graph.
            summary: ScoreSummary::from_scores(&scores),
            explanation,
            computed_at: Utc::now(),
        })
    }

    /// Distinct incident edges per node, both directions.
    async fn degree(&self, node_type: Option<&str>, limit: usize) -> Result<Vec<Scored>> {
        let rows = self.client.degree_table(node_type, limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.node_id, row.name, row.degree as f64))
            .collect())
    }

    /// Bounded closeness within a 3-hop neighborhood:
    /// `reachable_count / Σ(shortest_distance)`. Nodes that reach nothing
    /// are excluded rather than scored zero.
    async fn closeness(&self, node_type: Option<&str>, limit: usize) -> Result<Vec<Scored>> {
        let candidates = self
            .client
            .degree_table(node_type, CLOSENESS_CANDIDATES)
            .await?;
        let mut adjacency = AdjacencyCache::new(self.client.clone());

        let mut scored = Vec::new();
        for row in candidates {
            let distances = adjacency
                .bfs_distances(&row.node_id, CLOSENESS_MAX_DEPTH)
                .await?;
            if distances.is_empty() {
                continue;
            }
            let reachable = distances.len() as f64;
            let total_distance: usize = distances.values().sum();
            scored.push((row.node_id, row.name, reachable / total_distance as f64));
        }

        sort_scored(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }

    /// Local betweenness proxy, not exact betweenness: counts 2-hop paths
    /// a-v-b with both endpoints drawn from a capped candidate set. Biased
    /// toward high-degree nodes and blind to longer bridging paths.
    async fn betweenness(&self, node_type: Option<&str>, limit: usize) -> Result<Vec<Scored>> {
        let candidates = self
            .client
            .degree_table(node_type, BETWEENNESS_CANDIDATES)
            .await?;
        let ids: Vec<NodeId> = candidates.iter().map(|r| r.node_id.clone()).collect();
        let candidate_set: BTreeSet<NodeId> = ids.iter().cloned().collect();
        let adjacency = self.client.adjacency(&ids, None).await?;

        let mut scored: Vec<Scored> = candidates
            .into_iter()
            .map(|row| {
                let within = adjacency
                    .get(&row.node_id)
                    .map(|neighbors| {
                        neighbors
                            .iter()
                            .filter(|n| candidate_set.contains(*n))
                            .count()
                    })
                    .unwrap_or(0);
                let paths_through = within * within.saturating_sub(1) / 2;
                (row.node_id, row.name, paths_through as f64)
            })
            .collect();

        sort_scored(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }

    /// Single-pass degree proxy, not iterative PageRank:
    /// `0.15 + 0.85 · (in_degree + out_degree)`. The formula is kept as the
    /// documented contract.
    async fn pagerank(&self, node_type: Option<&str>, limit: usize) -> Result<Vec<Scored>> {
        let rows = self.client.directed_degree_table(node_type, limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let score = 0.15 + 0.85 * row.total_degree() as f64;
                (row.node_id, row.name, score)
            })
            .collect())
    }
}

/// Score descending, node id ascending for deterministic ties.
fn sort_scored(scored: &mut [Scored]) {
    scored.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}
