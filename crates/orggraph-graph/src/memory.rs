use crate::client::NEIGHBOR_CAP;
use crate::executor::GraphQueryExecutor;
use crate::query::{queries, GraphQuery};
use async_trait::async_trait;
use orggraph_core::{
    EdgeId, EdgeRef, NodeId, NodeRef, OrgGraphError, PropertyValue, Record, RecordValue, Result,
};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
struct GraphData {
    nodes: BTreeMap<NodeId, NodeRef>,
    edges: BTreeMap<EdgeId, EdgeRef>,
}

impl GraphData {
    fn node_ids(&self, label: Option<&str>) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| label.map_or(true, |l| n.has_label(l)))
            .map(|n| n.id.clone())
            .collect()
    }

    fn incident_edges<'a>(
        &'a self,
        node_id: &'a str,
        relationship_type: Option<&'a str>,
    ) -> impl Iterator<Item = &'a EdgeRef> + 'a {
        self.edges.values().filter(move |e| {
            (e.start_node_id == node_id || e.end_node_id == node_id)
                && relationship_type.map_or(true, |t| e.edge_type == t)
        })
    }

    fn degree(&self, node_id: &str) -> u64 {
        self.incident_edges(node_id, None).count() as u64
    }

    fn neighbors(&self, node_id: &str, relationship_type: Option<&str>) -> BTreeSet<NodeId> {
        self.incident_edges(node_id, relationship_type)
            .filter_map(|e| {
                if e.start_node_id == node_id && e.end_node_id != node_id {
                    Some(e.end_node_id.clone())
                } else if e.end_node_id == node_id && e.start_node_id != node_id {
                    Some(e.start_node_id.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Embedded graph backend. Interprets exactly the primitive traversal
/// queries the `TraversalClient` issues, dispatching on the query name, and
/// doubles as the reference semantics for those primitives. Used by tests
/// and the demo binary; production deployments point the engine at a real
/// graph store instead.
#[derive(Default)]
pub struct MemoryGraph {
    data: RwLock<GraphData>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: NodeRef) {
        self.data.write().nodes.insert(node.id.clone(), node);
    }

    /// Both endpoints must already exist.
    pub fn add_edge(&self, edge: EdgeRef) -> Result<()> {
        let mut data = self.data.write();
        if !data.nodes.contains_key(&edge.start_node_id) {
            return Err(OrgGraphError::validation(format!(
                "edge {} references unknown start node {}",
                edge.id, edge.start_node_id
            )));
        }
        if !data.nodes.contains_key(&edge.end_node_id) {
            return Err(OrgGraphError::validation(format!(
                "edge {} references unknown end node {}",
                edge.id, edge.end_node_id
            )));
        }
        data.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.data.read().edges.len()
    }

    fn usize_param(query: &GraphQuery, key: &str) -> Result<usize> {
        query
            .param(key)
            .and_then(|p| p.as_i64())
            .filter(|v| *v >= 0)
            .map(|v| v as usize)
            .ok_or_else(|| {
                OrgGraphError::query(
                    format!("missing or invalid parameter '{}'", key),
                    query.text.clone(),
                )
            })
    }

    fn id_list_param(query: &GraphQuery, key: &str) -> Result<Vec<NodeId>> {
        query
            .param(key)
            .and_then(|p| p.as_string_list())
            .ok_or_else(|| {
                OrgGraphError::query(
                    format!("missing or invalid parameter '{}'", key),
                    query.text.clone(),
                )
            })
    }

    fn name_value(node: &NodeRef) -> PropertyValue {
        node.properties
            .get("name")
            .cloned()
            .unwrap_or(PropertyValue::Null)
    }
}

#[async_trait]
impl GraphQueryExecutor for MemoryGraph {
    async fn execute(&self, query: &GraphQuery) -> Result<Vec<Record>> {
        let data = self.data.read();
        let label = query.opt_str_param("label");
        let relationship_type = query.opt_str_param("relationship_type");

        match query.name {
            queries::COUNT_NODES => {
                let total = data.node_ids(label).len();
                Ok(vec![Record::new().with("total", PropertyValue::from(total))])
            }

            queries::COUNT_RELATIONSHIPS => {
                let total = data
                    .edges
                    .values()
                    .filter(|e| relationship_type.map_or(true, |t| e.edge_type == t))
                    .count();
                Ok(vec![Record::new().with("total", PropertyValue::from(total))])
            }

            queries::LABEL_DISTRIBUTION => {
                let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
                for id in data.node_ids(label) {
                    for l in &data.nodes[&id].labels {
                        *distribution.entry(l.clone()).or_default() += 1;
                    }
                }
                Ok(distribution
                    .into_iter()
                    .map(|(l, total)| {
                        Record::new()
                            .with("label", PropertyValue::Text(l))
                            .with("total", PropertyValue::from(total))
                    })
                    .collect())
            }

            queries::RELATIONSHIP_TYPE_DISTRIBUTION => {
                let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
                for edge in data.edges.values() {
                    if relationship_type.map_or(true, |t| edge.edge_type == t) {
                        *distribution.entry(edge.edge_type.clone()).or_default() += 1;
                    }
                }
                Ok(distribution
                    .into_iter()
                    .map(|(t, total)| {
                        Record::new()
                            .with("relationship_type", PropertyValue::Text(t))
                            .with("total", PropertyValue::from(total))
                    })
                    .collect())
            }

            queries::DEGREE_TABLE => {
                let limit = Self::usize_param(query, "limit")?;
                let mut rows: Vec<(NodeId, u64)> = data
                    .node_ids(label)
                    .into_iter()
                    .map(|id| {
                        let degree = data.degree(&id);
                        (id, degree)
                    })
                    .collect();
                rows.sort_by_key(|(id, degree)| (Reverse(*degree), id.clone()));
                rows.truncate(limit);
                Ok(rows
                    .into_iter()
                    .map(|(id, degree)| {
                        let name = Self::name_value(&data.nodes[&id]);
                        Record::new()
                            .with("node_id", PropertyValue::Text(id))
                            .with("name", name)
                            .with("degree", PropertyValue::from(degree as usize))
                    })
                    .collect())
            }

            queries::DIRECTED_DEGREE_TABLE => {
                let limit = Self::usize_param(query, "limit")?;
                let mut rows: Vec<(NodeId, u64, u64)> = data
                    .node_ids(label)
                    .into_iter()
                    .map(|id| {
                        let out_degree =
                            data.edges.values().filter(|e| e.start_node_id == id).count() as u64;
                        let in_degree =
                            data.edges.values().filter(|e| e.end_node_id == id).count() as u64;
                        (id, in_degree, out_degree)
                    })
                    .collect();
                rows.sort_by_key(|(id, in_degree, out_degree)| {
                    (Reverse(in_degree + out_degree), id.clone())
                });
                rows.truncate(limit);
                Ok(rows
                    .into_iter()
                    .map(|(id, in_degree, out_degree)| {
                        let name = Self::name_value(&data.nodes[&id]);
                        Record::new()
                            .with("node_id", PropertyValue::Text(id))
                            .with("name", name)
                            .with("in_degree", PropertyValue::from(in_degree as usize))
                            .with("out_degree", PropertyValue::from(out_degree as usize))
                    })
                    .collect())
            }

            queries::ADJACENCY => {
                let node_ids = Self::id_list_param(query, "node_ids")?;
                let cap = query
                    .param("neighbor_cap")
                    .and_then(|p| p.as_i64())
                    .map(|v| v.max(0) as usize)
                    .unwrap_or(NEIGHBOR_CAP);
                let mut records = Vec::new();
                for id in node_ids {
                    if !data.nodes.contains_key(&id) {
                        continue;
                    }
                    let neighbors: Vec<RecordValue> = data
                        .neighbors(&id, relationship_type)
                        .into_iter()
                        .take(cap)
                        .map(|n| RecordValue::Scalar(PropertyValue::Text(n)))
                        .collect();
                    if neighbors.is_empty() {
                        continue;
                    }
                    records.push(
                        Record::new()
                            .with("node_id", PropertyValue::Text(id))
                            .with("neighbors", RecordValue::List(neighbors)),
                    );
                }
                Ok(records)
            }

            queries::NODE_IDS => {
                let limit = Self::usize_param(query, "limit")?;
                let mut ids = data.node_ids(label);
                ids.sort();
                ids.truncate(limit);
                Ok(ids
                    .into_iter()
                    .map(|id| Record::new().with("node_id", PropertyValue::Text(id)))
                    .collect())
            }

            queries::SAMPLE_NODE_IDS => {
                let n = Self::usize_param(query, "n")?;
                let seed = query
                    .param("seed")
                    .and_then(|p| p.as_i64())
                    .unwrap_or_default() as u64;
                let mut ids = data.node_ids(label);
                ids.sort();
                let mut rng = StdRng::seed_from_u64(seed);
                ids.shuffle(&mut rng);
                ids.truncate(n);
                Ok(ids
                    .into_iter()
                    .map(|id| Record::new().with("node_id", PropertyValue::Text(id)))
                    .collect())
            }

            queries::TRIANGLE_COUNTS => {
                let node_ids = Self::id_list_param(query, "node_ids")?;
                let mut records = Vec::new();
                for id in node_ids {
                    if !data.nodes.contains_key(&id) {
                        continue;
                    }
                    let neighbors: Vec<NodeId> = data.neighbors(&id, None).into_iter().collect();
                    let mut triangles = 0u64;
                    for (i, a) in neighbors.iter().enumerate() {
                        let a_neighbors = data.neighbors(a, None);
                        for b in neighbors.iter().skip(i + 1) {
                            if a_neighbors.contains(b) {
                                triangles += 1;
                            }
                        }
                    }
                    records.push(
                        Record::new()
                            .with("node_id", PropertyValue::Text(id))
                            .with("triangles", PropertyValue::from(triangles as usize)),
                    );
                }
                Ok(records)
            }

            other => Err(OrgGraphError::query(
                format!("unsupported query '{}'", other),
                query.text.clone(),
            )),
        }
    }
}
