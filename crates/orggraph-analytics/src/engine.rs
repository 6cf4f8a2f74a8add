use crate::centrality::CentralityAnalyzer;
use crate::community::CommunityDetector;
use crate::results::{AnalyticsResult, CentralityResult, CommunityResult, StatsResult};
use crate::sampling::SamplingEngine;
use crate::stats::GraphStatisticsCollector;
use crate::timeout::TimeoutGuard;
use orggraph_cache::{request_fingerprint, CacheStats, ResultCache};
use orggraph_core::{
    AnalyticsConfig, AnalyticsOperation, AnalyticsRequest, OrgGraphError, Result, SchemaCatalog,
};
use orggraph_graph::{GraphQueryExecutor, TraversalClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Façade over the analyzers, composed as
/// validate → fingerprint → cache → timeout guard → compute → cache.
///
/// The cache is injected at construction (never a hidden singleton), so
/// callers control sharing and tests stay isolated.
pub struct AnalyticsEngine {
    cache: Arc<ResultCache<AnalyticsResult>>,
    catalog: SchemaCatalog,
    config: AnalyticsConfig,
    timeout: TimeoutGuard,
    centrality: CentralityAnalyzer,
    community: CommunityDetector,
    statistics: GraphStatisticsCollector,
}

impl AnalyticsEngine {
    pub fn new(
        executor: Arc<dyn GraphQueryExecutor>,
        cache: Arc<ResultCache<AnalyticsResult>>,
        config: AnalyticsConfig,
    ) -> Self {
        let client = TraversalClient::new(executor);
        let sampling = SamplingEngine::new(client.clone());
        Self::assemble(client, sampling, cache, config)
    }

    /// Like `new`, with a fixed sampling seed for deterministic runs.
    pub fn with_sampling_seed(
        executor: Arc<dyn GraphQueryExecutor>,
        cache: Arc<ResultCache<AnalyticsResult>>,
        config: AnalyticsConfig,
        seed: u64,
    ) -> Self {
        let client = TraversalClient::new(executor);
        let sampling = SamplingEngine::with_seed(client.clone(), seed);
        Self::assemble(client, sampling, cache, config)
    }

    fn assemble(
        client: TraversalClient,
        sampling: SamplingEngine,
        cache: Arc<ResultCache<AnalyticsResult>>,
        config: AnalyticsConfig,
    ) -> Self {
        let catalog = config.catalog();
        let timeout = TimeoutGuard::new(Duration::from_secs(config.timeout_seconds));
        Self {
            cache,
            catalog,
            timeout,
            centrality: CentralityAnalyzer::new(client.clone()),
            community: CommunityDetector::new(client.clone()),
            statistics: GraphStatisticsCollector::new(client, sampling),
            config,
        }
    }

    pub async fn centrality(
        &self,
        algorithm: &str,
        node_type: Option<String>,
        limit: Option<usize>,
    ) -> Result<CentralityResult> {
        let request = AnalyticsRequest::centrality(
            algorithm,
            node_type,
            limit.unwrap_or(self.config.default_limit),
        );
        match self.execute(request).await? {
            AnalyticsResult::Centrality(result) => Ok(result),
            _ => Err(mismatched_payload()),
        }
    }

    pub async fn community(
        &self,
        algorithm: &str,
        node_type: Option<String>,
        min_size: Option<usize>,
        max_communities: Option<usize>,
    ) -> Result<CommunityResult> {
        let request = AnalyticsRequest::community(
            algorithm,
            node_type,
            min_size.unwrap_or(self.config.default_min_community_size),
            max_communities.unwrap_or(self.config.default_max_communities),
        );
        match self.execute(request).await? {
            AnalyticsResult::Community(result) => Ok(result),
            _ => Err(mismatched_payload()),
        }
    }

    pub async fn statistics(
        &self,
        node_type: Option<String>,
        relationship_type: Option<String>,
        sample_size: Option<usize>,
    ) -> Result<StatsResult> {
        let request = AnalyticsRequest::stats(
            node_type,
            relationship_type,
            sample_size.unwrap_or(self.config.default_sample_size),
        );
        match self.execute(request).await? {
            AnalyticsResult::Stats(result) => Ok(result),
            _ => Err(mismatched_payload()),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Remove cached results; `None` clears everything, a pattern removes
    /// keys containing it. Returns the number of entries removed.
    pub fn invalidate_cache(&self, pattern: Option<&str>) -> usize {
        self.cache.invalidate(pattern)
    }

    /// Hook for write-class graph operations elsewhere in the system: the
    /// whole cache is cleared (coarse invalidation, not tag-based). A write
    /// landing between a cache miss and the corresponding set can still
    /// leave one stale entry until its TTL expires; that window is an
    /// accepted trade-off.
    pub fn notify_write(&self) {
        let removed = self.cache.invalidate(None);
        info!(removed, "graph write observed; analytics result cache cleared");
    }

    async fn execute(&self, request: AnalyticsRequest) -> Result<AnalyticsResult> {
        request.validate(&self.catalog)?;

        let key = request_fingerprint(&request);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "analytics cache hit");
            return Ok(hit);
        }
        debug!(key = %key, "analytics cache miss, computing");

        let computed = match request.operation {
            AnalyticsOperation::Centrality => {
                let analyzer = self.centrality.clone();
                self.timeout
                    .run(async move {
                        analyzer
                            .run(&request)
                            .await
                            .map(AnalyticsResult::Centrality)
                    })
                    .await?
            }
            AnalyticsOperation::Community => {
                let detector = self.community.clone();
                self.timeout
                    .run(async move { detector.run(&request).await.map(AnalyticsResult::Community) })
                    .await?
            }
            AnalyticsOperation::Stats => {
                let collector = self.statistics.clone();
                self.timeout
                    .run(async move { collector.run(&request).await.map(AnalyticsResult::Stats) })
                    .await?
            }
        };

        self.cache.put(&key, computed.clone());
        Ok(computed)
    }
}

fn mismatched_payload() -> OrgGraphError {
    OrgGraphError::validation("cached payload does not match the requested operation")
}
