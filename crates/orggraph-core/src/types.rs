use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Backend-assigned opaque node identifier.
pub type NodeId = String;
pub type EdgeId = String;

/// Scalar property value as stored on nodes and edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<usize> for PropertyValue {
    fn from(v: usize) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

/// A node as returned by the graph backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: NodeId,
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl NodeRef {
    pub fn new(id: impl Into<NodeId>, labels: Vec<String>) -> Self {
        Self {
            id: id.into(),
            labels,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Display name, falling back to the node id.
    pub fn name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.id)
    }
}

/// A relationship as returned by the graph backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub id: EdgeId,
    pub edge_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
}

impl EdgeRef {
    pub fn new(
        id: impl Into<EdgeId>,
        edge_type: impl Into<String>,
        start: impl Into<NodeId>,
        end: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type: edge_type.into(),
            properties: BTreeMap::new(),
            start_node_id: start.into(),
            end_node_id: end.into(),
        }
    }
}

/// One named output of a backend record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Scalar(PropertyValue),
    Node(NodeRef),
    Edge(EdgeRef),
    List(Vec<RecordValue>),
}

impl From<PropertyValue> for RecordValue {
    fn from(v: PropertyValue) -> Self {
        RecordValue::Scalar(v)
    }
}

/// A row returned by the graph backend: named outputs to values.
///
/// Accessors return `None` on missing or mistyped columns; the query layer
/// turns that into a `Query` error carrying the offending query text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    columns: BTreeMap<String, RecordValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<RecordValue>) -> Self {
        self.columns.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&RecordValue> {
        self.columns.get(column)
    }

    pub fn i64(&self, column: &str) -> Option<i64> {
        match self.columns.get(column)? {
            RecordValue::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        match self.columns.get(column)? {
            RecordValue::Scalar(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn str(&self, column: &str) -> Option<&str> {
        match self.columns.get(column)? {
            RecordValue::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn node(&self, column: &str) -> Option<&NodeRef> {
        match self.columns.get(column)? {
            RecordValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn list(&self, column: &str) -> Option<&[RecordValue]> {
        match self.columns.get(column)? {
            RecordValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Decode a list column of string scalars, skipping non-string entries.
    pub fn str_list(&self, column: &str) -> Option<Vec<String>> {
        let items = self.list(column)?;
        Some(
            items
                .iter()
                .filter_map(|v| match v {
                    RecordValue::Scalar(PropertyValue::Text(s)) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
        )
    }
}
