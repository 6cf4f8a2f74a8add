use orggraph_core::{NodeId, Result};
use orggraph_graph::TraversalClient;
use std::collections::{BTreeMap, BTreeSet};

/// Memoized one-hop adjacency. Repeated BFS runs share fetches, and each
/// frontier expansion costs at most one backend query.
pub(crate) struct AdjacencyCache {
    client: TraversalClient,
    cached: BTreeMap<NodeId, Vec<NodeId>>,
}

impl AdjacencyCache {
    pub(crate) fn new(client: TraversalClient) -> Self {
        Self {
            client,
            cached: BTreeMap::new(),
        }
    }

    async fn ensure(&mut self, ids: &[NodeId]) -> Result<()> {
        let missing: Vec<NodeId> = ids
            .iter()
            .filter(|id| !self.cached.contains_key(*id))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let fetched = self.client.adjacency(&missing, None).await?;
        self.cached.extend(fetched);
        Ok(())
    }

    /// Shortest-path distances to every node reachable from `start` within
    /// `max_depth` hops, the start node excluded.
    pub(crate) async fn bfs_distances(
        &mut self,
        start: &NodeId,
        max_depth: usize,
    ) -> Result<BTreeMap<NodeId, usize>> {
        let mut distances = BTreeMap::new();
        let mut visited: BTreeSet<NodeId> = BTreeSet::from([start.clone()]);
        let mut frontier = vec![start.clone()];

        for depth in 1..=max_depth {
            self.ensure(&frontier).await?;
            let mut next = Vec::new();
            for node in &frontier {
                let neighbors = self.cached.get(node).map(Vec::as_slice).unwrap_or(&[]);
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        distances.insert(neighbor.clone(), depth);
                        next.push(neighbor.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(distances)
    }
}
