use orggraph_core::{NodeId, Result};
use orggraph_graph::TraversalClient;
use rand::Rng;
use tracing::debug;

/// Draws bounded uniform-random node samples to cap the cost of otherwise
/// O(n²)/O(n³) metrics. The seed is injectable so tests are deterministic;
/// without one, each draw uses fresh entropy.
#[derive(Clone)]
pub struct SamplingEngine {
    client: TraversalClient,
    seed: Option<u64>,
}

impl SamplingEngine {
    pub fn new(client: TraversalClient) -> Self {
        Self { client, seed: None }
    }

    pub fn with_seed(client: TraversalClient, seed: u64) -> Self {
        Self {
            client,
            seed: Some(seed),
        }
    }

    /// Up to `n` uniformly-random node ids within scope, via a single
    /// randomized LIMIT query.
    pub async fn sample_node_ids(&self, label: Option<&str>, n: usize) -> Result<Vec<NodeId>> {
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        debug!(n, seed, label = label.unwrap_or("-"), "sampling node ids");
        self.client.sample_node_ids(label, n, seed).await
    }
}
