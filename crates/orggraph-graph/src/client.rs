use crate::executor::GraphQueryExecutor;
use crate::query::{queries, GraphQuery};
use orggraph_core::{NodeId, OrgGraphError, PropertyValue, Record, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Per-node cap on neighbors returned by the adjacency primitive. Keeps a
/// single hub node from blowing up a frontier expansion.
pub const NEIGHBOR_CAP: usize = 1000;

/// One row of the degree table: distinct incident edges, both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeRow {
    pub node_id: NodeId,
    pub name: Option<String>,
    pub degree: u64,
}

/// One row of the directed degree table.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedDegreeRow {
    pub node_id: NodeId,
    pub name: Option<String>,
    pub in_degree: u64,
    pub out_degree: u64,
}

impl DirectedDegreeRow {
    pub fn total_degree(&self) -> u64 {
        self.in_degree + self.out_degree
    }
}

/// Typed wrappers over the primitive traversal queries. Every method issues
/// exactly one parameterized read-only query and decodes its rows, wrapping
/// decode failures with the offending query text.
///
/// Scope labels are interpolated into the query text (labels are not
/// bindable); the request validator has already checked them against the
/// schema allow-list before a query is built.
#[derive(Clone)]
pub struct TraversalClient {
    executor: Arc<dyn GraphQueryExecutor>,
}

impl TraversalClient {
    pub fn new(executor: Arc<dyn GraphQueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn count_nodes(&self, label: Option<&str>) -> Result<u64> {
        let query = GraphQuery::new(
            queries::COUNT_NODES,
            format!("MATCH {} RETURN count(n) AS total", node_pattern(label)),
        )
        .bind("label", opt_text(label));

        let rows = self.run(&query).await?;
        let total = rows
            .first()
            .and_then(|r| r.i64("total"))
            .ok_or_else(|| column_error("total", &query))?;
        Ok(total.max(0) as u64)
    }

    pub async fn count_relationships(&self, relationship_type: Option<&str>) -> Result<u64> {
        let query = GraphQuery::new(
            queries::COUNT_RELATIONSHIPS,
            format!(
                "MATCH ()-[{}]->() RETURN count(r) AS total",
                relationship_pattern(relationship_type)
            ),
        )
        .bind("relationship_type", opt_text(relationship_type));

        let rows = self.run(&query).await?;
        let total = rows
            .first()
            .and_then(|r| r.i64("total"))
            .ok_or_else(|| column_error("total", &query))?;
        Ok(total.max(0) as u64)
    }

    pub async fn label_distribution(&self, label: Option<&str>) -> Result<BTreeMap<String, u64>> {
        let query = GraphQuery::new(
            queries::LABEL_DISTRIBUTION,
            format!(
                "MATCH {} UNWIND labels(n) AS label RETURN label, count(*) AS total",
                node_pattern(label)
            ),
        )
        .bind("label", opt_text(label));

        let rows = self.run(&query).await?;
        let mut distribution = BTreeMap::new();
        for row in &rows {
            let label = row
                .str("label")
                .ok_or_else(|| column_error("label", &query))?;
            let total = row
                .i64("total")
                .ok_or_else(|| column_error("total", &query))?;
            distribution.insert(label.to_string(), total.max(0) as u64);
        }
        Ok(distribution)
    }

    pub async fn relationship_type_distribution(
        &self,
        relationship_type: Option<&str>,
    ) -> Result<BTreeMap<String, u64>> {
        let query = GraphQuery::new(
            queries::RELATIONSHIP_TYPE_DISTRIBUTION,
            format!(
                "MATCH ()-[{}]->() RETURN type(r) AS relationship_type, count(*) AS total",
                relationship_pattern(relationship_type)
            ),
        )
        .bind("relationship_type", opt_text(relationship_type));

        let rows = self.run(&query).await?;
        let mut distribution = BTreeMap::new();
        for row in &rows {
            let relationship_type = row
                .str("relationship_type")
                .ok_or_else(|| column_error("relationship_type", &query))?;
            let total = row
                .i64("total")
                .ok_or_else(|| column_error("total", &query))?;
            distribution.insert(relationship_type.to_string(), total.max(0) as u64);
        }
        Ok(distribution)
    }

    /// Per-node distinct incident edge counts (both directions), ordered by
    /// degree descending with node id as the deterministic tie-break.
    pub async fn degree_table(&self, label: Option<&str>, limit: usize) -> Result<Vec<DegreeRow>> {
        let query = GraphQuery::new(
            queries::DEGREE_TABLE,
            format!(
                "MATCH {} OPTIONAL MATCH (n)-[r]-() \
                 RETURN n.id AS node_id, n.name AS name, count(DISTINCT r) AS degree \
                 ORDER BY degree DESC, node_id ASC LIMIT $limit",
                node_pattern(label)
            ),
        )
        .bind("label", opt_text(label))
        .bind("limit", limit);

        let rows = self.run(&query).await?;
        rows.iter()
            .map(|row| {
                Ok(DegreeRow {
                    node_id: row
                        .str("node_id")
                        .ok_or_else(|| column_error("node_id", &query))?
                        .to_string(),
                    name: row.str("name").map(String::from),
                    degree: row
                        .i64("degree")
                        .ok_or_else(|| column_error("degree", &query))?
                        .max(0) as u64,
                })
            })
            .collect()
    }

    /// In/out degree per node, ordered by total degree descending, node id
    /// ascending.
    pub async fn directed_degree_table(
        &self,
        label: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DirectedDegreeRow>> {
        let query = GraphQuery::new(
            queries::DIRECTED_DEGREE_TABLE,
            format!(
                "MATCH {} OPTIONAL MATCH (n)-[out]->() WITH n, count(DISTINCT out) AS out_degree \
                 OPTIONAL MATCH (n)<-[inc]-() \
                 RETURN n.id AS node_id, n.name AS name, count(DISTINCT inc) AS in_degree, out_degree \
                 ORDER BY in_degree + out_degree DESC, node_id ASC LIMIT $limit",
                node_pattern(label)
            ),
        )
        .bind("label", opt_text(label))
        .bind("limit", limit);

        let rows = self.run(&query).await?;
        rows.iter()
            .map(|row| {
                Ok(DirectedDegreeRow {
                    node_id: row
                        .str("node_id")
                        .ok_or_else(|| column_error("node_id", &query))?
                        .to_string(),
                    name: row.str("name").map(String::from),
                    in_degree: row
                        .i64("in_degree")
                        .ok_or_else(|| column_error("in_degree", &query))?
                        .max(0) as u64,
                    out_degree: row
                        .i64("out_degree")
                        .ok_or_else(|| column_error("out_degree", &query))?
                        .max(0) as u64,
                })
            })
            .collect()
    }

    /// One-hop neighbor lists for the given nodes. Every requested id is
    /// present in the returned map; isolated nodes map to an empty list.
    /// Issues no query for an empty id slice.
    pub async fn adjacency(
        &self,
        node_ids: &[NodeId],
        relationship_type: Option<&str>,
    ) -> Result<BTreeMap<NodeId, Vec<NodeId>>> {
        if node_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let query = GraphQuery::new(
            queries::ADJACENCY,
            format!(
                "MATCH (n)-[{}]-(m) WHERE n.id IN $node_ids \
                 RETURN n.id AS node_id, collect(DISTINCT m.id) AS neighbors",
                relationship_pattern(relationship_type)
            ),
        )
        .bind("relationship_type", opt_text(relationship_type))
        .bind("neighbor_cap", NEIGHBOR_CAP)
        .bind_id_list("node_ids", node_ids.iter().cloned());

        let rows = self.run(&query).await?;
        let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = node_ids
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        for row in &rows {
            let node_id = row
                .str("node_id")
                .ok_or_else(|| column_error("node_id", &query))?;
            let neighbors = row
                .str_list("neighbors")
                .ok_or_else(|| column_error("neighbors", &query))?;
            adjacency.insert(node_id.to_string(), neighbors);
        }
        Ok(adjacency)
    }

    /// Qualifying node ids in deterministic (ascending) order, capped.
    pub async fn node_ids(&self, label: Option<&str>, limit: usize) -> Result<Vec<NodeId>> {
        let query = GraphQuery::new(
            queries::NODE_IDS,
            format!(
                "MATCH {} RETURN n.id AS node_id ORDER BY n.id ASC LIMIT $limit",
                node_pattern(label)
            ),
        )
        .bind("label", opt_text(label))
        .bind("limit", limit);

        let rows = self.run(&query).await?;
        rows.iter()
            .map(|row| {
                Ok(row
                    .str("node_id")
                    .ok_or_else(|| column_error("node_id", &query))?
                    .to_string())
            })
            .collect()
    }

    /// Up to `n` node ids in randomized order. The seed is forwarded so
    /// backends that support seeded sampling stay reproducible.
    pub async fn sample_node_ids(
        &self,
        label: Option<&str>,
        n: usize,
        seed: u64,
    ) -> Result<Vec<NodeId>> {
        let query = GraphQuery::new(
            queries::SAMPLE_NODE_IDS,
            format!(
                "MATCH {} WITH n ORDER BY rand() LIMIT $n RETURN n.id AS node_id",
                node_pattern(label)
            ),
        )
        .bind("label", opt_text(label))
        .bind("n", n)
        .bind("seed", seed as i64);

        let rows = self.run(&query).await?;
        rows.iter()
            .map(|row| {
                Ok(row
                    .str("node_id")
                    .ok_or_else(|| column_error("node_id", &query))?
                    .to_string())
            })
            .collect()
    }

    /// Triangle count per node: pairs of directly-connected neighbors.
    /// Issues no query for an empty id slice.
    pub async fn triangle_counts(&self, node_ids: &[NodeId]) -> Result<BTreeMap<NodeId, u64>> {
        if node_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let query = GraphQuery::new(
            queries::TRIANGLE_COUNTS,
            "MATCH (n) WHERE n.id IN $node_ids \
             OPTIONAL MATCH (n)--(a)--(b)--(n) WHERE a.id < b.id \
             RETURN n.id AS node_id, count(DISTINCT [a.id, b.id]) AS triangles",
        )
        .bind_id_list("node_ids", node_ids.iter().cloned());

        let rows = self.run(&query).await?;
        let mut counts: BTreeMap<NodeId, u64> =
            node_ids.iter().map(|id| (id.clone(), 0)).collect();
        for row in &rows {
            let node_id = row
                .str("node_id")
                .ok_or_else(|| column_error("node_id", &query))?;
            let triangles = row
                .i64("triangles")
                .ok_or_else(|| column_error("triangles", &query))?;
            counts.insert(node_id.to_string(), triangles.max(0) as u64);
        }
        Ok(counts)
    }

    async fn run(&self, query: &GraphQuery) -> Result<Vec<Record>> {
        debug!(name = query.name, query = %query.text, "executing traversal query");
        self.executor.execute(query).await
    }
}

fn node_pattern(label: Option<&str>) -> String {
    match label {
        Some(label) => format!("(n:`{}`)", label),
        None => "(n)".to_string(),
    }
}

fn relationship_pattern(relationship_type: Option<&str>) -> String {
    match relationship_type {
        Some(relationship_type) => format!("r:`{}`", relationship_type),
        None => "r".to_string(),
    }
}

fn opt_text(value: Option<&str>) -> PropertyValue {
    value
        .map(PropertyValue::from)
        .unwrap_or(PropertyValue::Null)
}

fn column_error(column: &str, query: &GraphQuery) -> OrgGraphError {
    OrgGraphError::query(
        format!("missing or mistyped column '{}'", column),
        query.text.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orggraph_core::RecordValue;
    use parking_lot::Mutex;

    /// Records every query and replays a canned response.
    struct RecordingExecutor {
        queries: Mutex<Vec<GraphQuery>>,
        response: Vec<Record>,
    }

    impl RecordingExecutor {
        fn new(response: Vec<Record>) -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
                response,
            }
        }
    }

    #[async_trait]
    impl GraphQueryExecutor for RecordingExecutor {
        async fn execute(&self, query: &GraphQuery) -> Result<Vec<Record>> {
            self.queries.lock().push(query.clone());
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn count_nodes_interpolates_label_and_binds_param() {
        let executor = Arc::new(RecordingExecutor::new(vec![
            Record::new().with("total", PropertyValue::Int(42)),
        ]));
        let client = TraversalClient::new(executor.clone());

        let total = client.count_nodes(Some("Person")).await.unwrap();
        assert_eq!(total, 42);

        let queries = executor.queries.lock();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].text.contains("(n:`Person`)"));
        assert_eq!(queries[0].opt_str_param("label"), Some("Person"));
    }

    #[tokio::test]
    async fn adjacency_fills_missing_ids_and_skips_empty_input() {
        let executor = Arc::new(RecordingExecutor::new(vec![Record::new()
            .with("node_id", PropertyValue::Text("a".into()))
            .with(
                "neighbors",
                RecordValue::List(vec![RecordValue::Scalar(PropertyValue::Text("b".into()))]),
            )]));
        let client = TraversalClient::new(executor.clone());

        let adjacency = client
            .adjacency(&["a".to_string(), "lonely".to_string()], None)
            .await
            .unwrap();
        assert_eq!(adjacency["a"], vec!["b".to_string()]);
        assert!(adjacency["lonely"].is_empty());

        let empty = client.adjacency(&[], None).await.unwrap();
        assert!(empty.is_empty());
        // The empty call must not have issued a query.
        assert_eq!(executor.queries.lock().len(), 1);
    }

    #[tokio::test]
    async fn decode_failure_carries_query_text() {
        let executor = Arc::new(RecordingExecutor::new(vec![
            Record::new().with("wrong_column", PropertyValue::Int(1)),
        ]));
        let client = TraversalClient::new(executor);

        let err = client.count_nodes(None).await.unwrap_err();
        match err {
            OrgGraphError::Query { message, query } => {
                assert!(message.contains("total"));
                assert!(query.contains("MATCH (n)"));
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }
}
