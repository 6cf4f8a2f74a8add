use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Allow-list of node labels and relationship types the engine may be scoped
/// to. Scope filters are validated against this catalog before any query is
/// built, so unknown labels never reach the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub node_labels: BTreeSet<String>,
    pub relationship_types: BTreeSet<String>,
}

impl SchemaCatalog {
    pub fn new<L, R>(labels: L, relationship_types: R) -> Self
    where
        L: IntoIterator<Item = String>,
        R: IntoIterator<Item = String>,
    {
        Self {
            node_labels: labels.into_iter().collect(),
            relationship_types: relationship_types.into_iter().collect(),
        }
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.node_labels.contains(label)
    }

    pub fn contains_relationship_type(&self, relationship_type: &str) -> bool {
        self.relationship_types.contains(relationship_type)
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new(
            default_node_labels().into_iter().map(String::from),
            default_relationship_types().into_iter().map(String::from),
        )
    }
}

pub(crate) fn default_node_labels() -> Vec<&'static str> {
    vec!["Person", "Team", "Project", "Skill", "Document"]
}

pub(crate) fn default_relationship_types() -> Vec<&'static str> {
    vec![
        "REPORTS_TO",
        "MEMBER_OF",
        "WORKS_ON",
        "HAS_SKILL",
        "COLLABORATES_WITH",
        "AUTHORED",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_contains_org_schema() {
        let catalog = SchemaCatalog::default();
        assert!(catalog.contains_label("Person"));
        assert!(catalog.contains_relationship_type("REPORTS_TO"));
        assert!(!catalog.contains_label("Malware"));
    }
}
