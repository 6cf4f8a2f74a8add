use orggraph_core::PropertyValue;
use std::collections::BTreeMap;
use std::fmt;

/// Names of the primitive traversal queries the engine issues. Backends that
/// cannot parse the query text (the embedded one) dispatch on the name.
pub mod queries {
    pub const COUNT_NODES: &str = "count_nodes";
    pub const COUNT_RELATIONSHIPS: &str = "count_relationships";
    pub const LABEL_DISTRIBUTION: &str = "label_distribution";
    pub const RELATIONSHIP_TYPE_DISTRIBUTION: &str = "relationship_type_distribution";
    pub const DEGREE_TABLE: &str = "degree_table";
    pub const DIRECTED_DEGREE_TABLE: &str = "directed_degree_table";
    pub const ADJACENCY: &str = "adjacency";
    pub const NODE_IDS: &str = "node_ids";
    pub const SAMPLE_NODE_IDS: &str = "sample_node_ids";
    pub const TRIANGLE_COUNTS: &str = "triangle_counts";
}

/// A bound query parameter: a scalar or a flat list of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Scalar(PropertyValue),
    List(Vec<PropertyValue>),
}

impl QueryParam {
    pub fn as_scalar(&self) -> Option<&PropertyValue> {
        match self {
            QueryParam::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(|v| v.as_i64())
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(|v| v.as_str())
    }

    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            QueryParam::List(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// A named, parameterized, read-only traversal query.
///
/// `text` is the statement a query-language backend would run; `name` plus
/// `params` carry the same information for backends that dispatch natively.
#[derive(Debug, Clone)]
pub struct GraphQuery {
    pub name: &'static str,
    pub text: String,
    pub params: BTreeMap<String, QueryParam>,
}

impl GraphQuery {
    pub fn new(name: &'static str, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn bind(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.params
            .insert(key.to_string(), QueryParam::Scalar(value.into()));
        self
    }

    pub fn bind_id_list<I, S>(mut self, key: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = ids
            .into_iter()
            .map(|id| PropertyValue::Text(id.into()))
            .collect();
        self.params.insert(key.to_string(), QueryParam::List(items));
        self
    }

    pub fn param(&self, key: &str) -> Option<&QueryParam> {
        self.params.get(key)
    }

    /// Optional string parameter, treating an explicit `Null` binding as absent.
    pub fn opt_str_param(&self, key: &str) -> Option<&str> {
        match self.params.get(key)? {
            QueryParam::Scalar(PropertyValue::Null) => None,
            other => other.as_str(),
        }
    }
}

impl fmt::Display for GraphQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_accumulates_params() {
        let query = GraphQuery::new(queries::COUNT_NODES, "MATCH (n) RETURN count(n) AS total")
            .bind("label", "Person")
            .bind("limit", 50usize);

        assert_eq!(query.opt_str_param("label"), Some("Person"));
        assert_eq!(query.param("limit").and_then(|p| p.as_i64()), Some(50));
    }

    #[test]
    fn null_binding_reads_as_absent() {
        let query = GraphQuery::new(queries::COUNT_NODES, "MATCH (n) RETURN count(n) AS total")
            .bind("label", PropertyValue::Null);
        assert_eq!(query.opt_str_param("label"), None);
    }

    #[test]
    fn id_list_binding() {
        let query = GraphQuery::new(queries::ADJACENCY, "...")
            .bind_id_list("node_ids", vec!["a", "b"]);
        let ids = query.param("node_ids").unwrap().as_string_list().unwrap();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
