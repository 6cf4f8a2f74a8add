use crate::results::{round_score, Community, CommunityResult};
use chrono::Utc;
use orggraph_core::{AnalyticsRequest, CommunityAlgorithm, NodeId, Result};
use orggraph_graph::TraversalClient;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Seed cap shared by reachability clustering and label propagation.
const COMMUNITY_SEEDS: usize = 500;
/// Candidate cap for the O(n²) pairwise similarity stage.
const SIMILARITY_CANDIDATES: usize = 200;
/// Neighbor-set similarity above which two nodes are grouped.
const JACCARD_THRESHOLD: f64 = 0.3;

type Adjacency = BTreeMap<NodeId, BTreeSet<NodeId>>;

/// Groups nodes into communities with three bounded strategies. All three
/// are approximations: they operate on a capped seed set and none is run to
/// convergence.
#[derive(Clone)]
pub struct CommunityDetector {
    client: TraversalClient,
}

impl CommunityDetector {
    pub fn new(client: TraversalClient) -> Self {
        Self { client }
    }

    pub async fn run(&self, request: &AnalyticsRequest) -> Result<CommunityResult> {
        let algorithm: CommunityAlgorithm = request.algorithm.parse()?;
        let node_type = request.node_type.as_deref();
        debug!(%algorithm, min_size = request.min_community_size, "running community detection");

        let (groups, adjacency) = match algorithm {
            CommunityAlgorithm::ConnectedComponents => {
                self.connected_components(node_type).await?
            }
            CommunityAlgorithm::LabelPropagation => self.label_propagation(node_type).await?,
            CommunityAlgorithm::ModularityClustering => self.similarity_clusters(node_type).await?,
        };

        Ok(assemble(algorithm, request, groups, &adjacency))
    }

    /// Seed nodes (deterministic ascending order) plus their adjacency
    /// restricted to the seed set.
    async fn seeded_adjacency(
        &self,
        node_type: Option<&str>,
        cap: usize,
    ) -> Result<(Vec<NodeId>, Adjacency)> {
        let seeds = self.client.node_ids(node_type, cap).await?;
        let fetched = self.client.adjacency(&seeds, None).await?;
        let seed_set: BTreeSet<NodeId> = seeds.iter().cloned().collect();
        let induced = fetched
            .into_iter()
            .map(|(id, neighbors)| {
                let within: BTreeSet<NodeId> = neighbors
                    .into_iter()
                    .filter(|n| seed_set.contains(n))
                    .collect();
                (id, within)
            })
            .collect();
        Ok((seeds, induced))
    }

    /// Reachability clustering over up to 500 seed nodes: the connected
    /// components of the seed-induced subgraph.
    async fn connected_components(
        &self,
        node_type: Option<&str>,
    ) -> Result<(Vec<Vec<NodeId>>, Adjacency)> {
        let (seeds, adjacency) = self.seeded_adjacency(node_type, COMMUNITY_SEEDS).await?;

        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut groups = Vec::new();
        for seed in &seeds {
            if visited.contains(seed) {
                continue;
            }
            let mut group = Vec::new();
            let mut frontier = vec![seed.clone()];
            visited.insert(seed.clone());
            while let Some(node) = frontier.pop() {
                group.push(node.clone());
                if let Some(neighbors) = adjacency.get(&node) {
                    for neighbor in neighbors {
                        if visited.insert(neighbor.clone()) {
                            frontier.push(neighbor.clone());
                        }
                    }
                }
            }
            group.sort();
            groups.push(group);
        }

        Ok((groups, adjacency))
    }

    /// Single majority-vote pass over immediate neighbors, in ascending node
    /// id order with in-place updates: an approximation, not run to
    /// convergence. Vote ties pick the smallest label.
    async fn label_propagation(
        &self,
        node_type: Option<&str>,
    ) -> Result<(Vec<Vec<NodeId>>, Adjacency)> {
        let (seeds, adjacency) = self.seeded_adjacency(node_type, COMMUNITY_SEEDS).await?;

        let mut labels: BTreeMap<NodeId, NodeId> =
            seeds.iter().map(|s| (s.clone(), s.clone())).collect();
        for node in &seeds {
            let Some(neighbors) = adjacency.get(node) else {
                continue;
            };
            if neighbors.is_empty() {
                continue;
            }
            let mut votes: BTreeMap<NodeId, usize> = BTreeMap::new();
            for neighbor in neighbors {
                if let Some(label) = labels.get(neighbor) {
                    *votes.entry(label.clone()).or_default() += 1;
                }
            }
            // Ascending iteration keeps the smallest label on vote ties.
            let mut winner: Option<(NodeId, usize)> = None;
            for (label, count) in votes {
                match &winner {
                    Some((_, best)) if count <= *best => {}
                    _ => winner = Some((label, count)),
                }
            }
            if let Some((label, _)) = winner {
                labels.insert(node.clone(), label);
            }
        }

        let mut groups_by_label: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (node, label) in labels {
            groups_by_label.entry(label).or_default().push(node);
        }
        let groups = groups_by_label
            .into_values()
            .map(|mut members| {
                members.sort();
                members
            })
            .collect();

        Ok((groups, adjacency))
    }

    /// Groups nodes whose neighbor sets have Jaccard similarity above 0.3,
    /// merging overlapping pairs transitively. The derived modularity score
    /// is a mean-density proxy, not the standard modularity metric.
    async fn similarity_clusters(
        &self,
        node_type: Option<&str>,
    ) -> Result<(Vec<Vec<NodeId>>, Adjacency)> {
        let candidates = self
            .client
            .node_ids(node_type, SIMILARITY_CANDIDATES)
            .await?;
        let fetched = self.client.adjacency(&candidates, None).await?;
        let neighbor_sets: BTreeMap<NodeId, BTreeSet<NodeId>> = fetched
            .iter()
            .map(|(id, neighbors)| (id.clone(), neighbors.iter().cloned().collect()))
            .collect();

        let mut parents: Vec<usize> = (0..candidates.len()).collect();
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let a = &neighbor_sets[&candidates[i]];
                let b = &neighbor_sets[&candidates[j]];
                if jaccard(a, b) > JACCARD_THRESHOLD {
                    union(&mut parents, i, j);
                }
            }
        }

        let mut groups_by_root: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for (i, id) in candidates.iter().enumerate() {
            let root = find(&mut parents, i);
            groups_by_root.entry(root).or_default().push(id.clone());
        }
        let groups = groups_by_root
            .into_values()
            .map(|mut members| {
                members.sort();
                members
            })
            .collect();

        // Internal-degree bookkeeping uses adjacency restricted to candidates.
        let candidate_set: BTreeSet<NodeId> = candidates.iter().cloned().collect();
        let induced = neighbor_sets
            .into_iter()
            .map(|(id, neighbors)| {
                let within = neighbors
                    .into_iter()
                    .filter(|n| candidate_set.contains(n))
                    .collect();
                (id, within)
            })
            .collect();

        Ok((groups, induced))
    }
}

fn jaccard(a: &BTreeSet<NodeId>, b: &BTreeSet<NodeId>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

fn find(parents: &mut Vec<usize>, i: usize) -> usize {
    let mut root = i;
    while parents[root] != root {
        root = parents[root];
    }
    let mut node = i;
    while parents[node] != root {
        let next = parents[node];
        parents[node] = root;
        node = next;
    }
    root
}

fn union(parents: &mut Vec<usize>, i: usize, j: usize) {
    let (a, b) = (find(parents, i), find(parents, j));
    if a != b {
        parents[b.max(a)] = a.min(b);
    }
}

fn assemble(
    algorithm: CommunityAlgorithm,
    request: &AnalyticsRequest,
    groups: Vec<Vec<NodeId>>,
    adjacency: &Adjacency,
) -> CommunityResult {
    let mut communities: Vec<Community> = groups
        .into_iter()
        .filter(|members| members.len() >= request.min_community_size)
        .map(|members| {
            let member_set: BTreeSet<NodeId> = members.iter().cloned().collect();
            let internal_degree = |node: &NodeId| {
                adjacency
                    .get(node)
                    .map(|neighbors| neighbors.intersection(&member_set).count())
                    .unwrap_or(0)
            };

            let size = members.len();
            let total_internal: usize = members.iter().map(internal_degree).sum();
            let density = if size <= 1 {
                0.0
            } else {
                total_internal as f64 / (size * (size - 1)) as f64
            };

            // Members are sorted, so strict comparison keeps the lowest id
            // on internal-degree ties.
            let mut central_node = members[0].clone();
            let mut best = internal_degree(&central_node);
            for member in &members[1..] {
                let degree = internal_degree(member);
                if degree > best {
                    best = degree;
                    central_node = member.clone();
                }
            }

            Community {
                rank: 0,
                size,
                central_node,
                density: round_score(density),
                members,
            }
        })
        .collect();

    communities.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.central_node.cmp(&b.central_node))
    });
    communities.truncate(request.max_communities);
    for (i, community) in communities.iter_mut().enumerate() {
        community.rank = i + 1;
    }

    let modularity_score = if communities.is_empty() {
        0.0
    } else {
        round_score(
            communities.iter().map(|c| c.density).sum::<f64>() / communities.len() as f64,
        )
    };
    let explanation = communities.is_empty().then(|| {
        "No communities matched the requested scope and size threshold.".to_string()
    });

    CommunityResult {
        algorithm: algorithm.to_string(),
        node_type: request.node_type.clone(),
        communities,
        modularity_score,
        explanation,
        computed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orggraph_core::{EdgeRef, NodeRef};
    use orggraph_graph::MemoryGraph;
    use std::sync::Arc;

    fn detector(graph: MemoryGraph) -> CommunityDetector {
        CommunityDetector::new(TraversalClient::new(Arc::new(graph)))
    }

    /// Two triangles plus one isolated node.
    fn two_triangles() -> MemoryGraph {
        let graph = MemoryGraph::new();
        for id in ["a1", "a2", "a3", "b1", "b2", "b3", "lone"] {
            graph.add_node(NodeRef::new(id, vec!["Person".into()]));
        }
        for (edge_id, from, to) in [
            ("e1", "a1", "a2"),
            ("e2", "a2", "a3"),
            ("e3", "a3", "a1"),
            ("e4", "b1", "b2"),
            ("e5", "b2", "b3"),
            ("e6", "b3", "b1"),
        ] {
            graph
                .add_edge(EdgeRef::new(edge_id, "COLLABORATES_WITH", from, to))
                .unwrap();
        }
        graph
    }

    #[tokio::test]
    async fn connected_components_split_the_triangles() {
        let detector = detector(two_triangles());
        let request = AnalyticsRequest::community("connected_components", None, 2, 20);
        let result = detector.run(&request).await.unwrap();

        // The isolated node falls below min_community_size = 2.
        assert_eq!(result.communities.len(), 2);
        for community in &result.communities {
            assert_eq!(community.size, 3);
            // triangle density: 6 internal degree / (3·2) = 1.0
            assert_eq!(community.density, 1.0);
        }
        assert_eq!(result.modularity_score, 1.0);
        assert_eq!(result.communities[0].rank, 1);
        // Size ties break on central node id: the a-triangle first.
        assert_eq!(result.communities[0].central_node, "a1");
    }

    #[tokio::test]
    async fn raising_min_size_is_monotonic() {
        let detector = detector(two_triangles());
        let mut previous = usize::MAX;
        for min_size in [1, 2, 3, 4] {
            let request =
                AnalyticsRequest::community("connected_components", None, min_size, 20);
            let count = detector.run(&request).await.unwrap().communities.len();
            assert!(count <= previous);
            previous = count;
        }
    }

    #[tokio::test]
    async fn max_communities_caps_ordered_output() {
        let detector = detector(two_triangles());
        let request = AnalyticsRequest::community("connected_components", None, 1, 2);
        let result = detector.run(&request).await.unwrap();

        assert_eq!(result.communities.len(), 2);
        // Ordered by size descending: the singleton never outranks a triangle.
        assert!(result.communities.iter().all(|c| c.size == 3));
    }

    #[tokio::test]
    async fn label_propagation_groups_triangles() {
        let detector = detector(two_triangles());
        let request = AnalyticsRequest::community("label_propagation", None, 2, 20);
        let result = detector.run(&request).await.unwrap();

        assert!(!result.communities.is_empty());
        for community in &result.communities {
            // No community mixes the two triangles.
            let in_a = community.members.iter().filter(|m| m.starts_with('a')).count();
            let in_b = community.members.iter().filter(|m| m.starts_with('b')).count();
            assert!(in_a == 0 || in_b == 0);
        }
    }

    #[tokio::test]
    async fn similarity_clustering_joins_shared_neighborhoods() {
        // x and y share both neighbors (Jaccard 1.0); z is off on its own.
        let graph = MemoryGraph::new();
        for id in ["x", "y", "h1", "h2", "z", "w"] {
            graph.add_node(NodeRef::new(id, vec!["Person".into()]));
        }
        for (edge_id, from, to) in [
            ("e1", "x", "h1"),
            ("e2", "x", "h2"),
            ("e3", "y", "h1"),
            ("e4", "y", "h2"),
            ("e5", "z", "w"),
        ] {
            graph
                .add_edge(EdgeRef::new(edge_id, "COLLABORATES_WITH", from, to))
                .unwrap();
        }

        let detector = detector(graph);
        let request = AnalyticsRequest::community("modularity_clustering", None, 2, 20);
        let result = detector.run(&request).await.unwrap();

        let xy = result
            .communities
            .iter()
            .find(|c| c.members.contains(&"x".to_string()))
            .expect("x should land in a cluster");
        assert!(xy.members.contains(&"y".to_string()));
        assert!(!xy.members.contains(&"z".to_string()));
    }

    #[tokio::test]
    async fn empty_graph_yields_empty_success() {
        let detector = detector(MemoryGraph::new());
        let request = AnalyticsRequest::community("connected_components", None, 2, 20);
        let result = detector.run(&request).await.unwrap();

        assert!(result.communities.is_empty());
        assert_eq!(result.modularity_score, 0.0);
        assert!(result.explanation.is_some());
    }
}
