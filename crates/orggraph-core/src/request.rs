use crate::error::{OrgGraphError, Result};
use crate::schema::SchemaCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_SAMPLE_SIZE: usize = 10;
pub const MAX_SAMPLE_SIZE: usize = 5000;
pub const MAX_RESULT_LIMIT: usize = 50;
pub const MAX_COMMUNITIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsOperation {
    Centrality,
    Community,
    Stats,
}

impl fmt::Display for AnalyticsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalyticsOperation::Centrality => "centrality",
            AnalyticsOperation::Community => "community",
            AnalyticsOperation::Stats => "stats",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityAlgorithm {
    Degree,
    Closeness,
    Betweenness,
    Pagerank,
}

impl fmt::Display for CentralityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CentralityAlgorithm::Degree => "degree",
            CentralityAlgorithm::Closeness => "closeness",
            CentralityAlgorithm::Betweenness => "betweenness",
            CentralityAlgorithm::Pagerank => "pagerank",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CentralityAlgorithm {
    type Err = OrgGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "degree" => Ok(CentralityAlgorithm::Degree),
            "closeness" => Ok(CentralityAlgorithm::Closeness),
            "betweenness" => Ok(CentralityAlgorithm::Betweenness),
            "pagerank" => Ok(CentralityAlgorithm::Pagerank),
            other => Err(OrgGraphError::validation(format!(
                "unknown centrality algorithm '{}', expected one of: degree, closeness, betweenness, pagerank",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityAlgorithm {
    ConnectedComponents,
    LabelPropagation,
    ModularityClustering,
}

impl fmt::Display for CommunityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommunityAlgorithm::ConnectedComponents => "connected_components",
            CommunityAlgorithm::LabelPropagation => "label_propagation",
            CommunityAlgorithm::ModularityClustering => "modularity_clustering",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CommunityAlgorithm {
    type Err = OrgGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "connected_components" => Ok(CommunityAlgorithm::ConnectedComponents),
            "label_propagation" => Ok(CommunityAlgorithm::LabelPropagation),
            "modularity_clustering" => Ok(CommunityAlgorithm::ModularityClustering),
            other => Err(OrgGraphError::validation(format!(
                "unknown community algorithm '{}', expected one of: connected_components, label_propagation, modularity_clustering",
                other
            ))),
        }
    }
}

/// One analytics call, created per request and never persisted.
///
/// Field declaration order is the canonical order used for fingerprinting;
/// equal requests always canonicalize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    pub operation: AnalyticsOperation,
    pub algorithm: String,
    pub node_type: Option<String>,
    pub relationship_type: Option<String>,
    pub limit: usize,
    pub sample_size: usize,
    pub min_community_size: usize,
    pub max_communities: usize,
}

impl AnalyticsRequest {
    pub fn centrality(algorithm: impl Into<String>, node_type: Option<String>, limit: usize) -> Self {
        Self {
            operation: AnalyticsOperation::Centrality,
            algorithm: algorithm.into(),
            node_type,
            relationship_type: None,
            limit,
            sample_size: MIN_SAMPLE_SIZE,
            min_community_size: 1,
            max_communities: 1,
        }
    }

    pub fn community(
        algorithm: impl Into<String>,
        node_type: Option<String>,
        min_community_size: usize,
        max_communities: usize,
    ) -> Self {
        Self {
            operation: AnalyticsOperation::Community,
            algorithm: algorithm.into(),
            node_type,
            relationship_type: None,
            limit: 1,
            sample_size: MIN_SAMPLE_SIZE,
            min_community_size,
            max_communities,
        }
    }

    pub fn stats(
        node_type: Option<String>,
        relationship_type: Option<String>,
        sample_size: usize,
    ) -> Self {
        Self {
            operation: AnalyticsOperation::Stats,
            algorithm: "summary".to_string(),
            node_type,
            relationship_type,
            limit: 1,
            sample_size,
            min_community_size: 1,
            max_communities: 1,
        }
    }

    /// Validate algorithm, numeric ranges and scope filters against the
    /// schema allow-list. Runs before any query is built; the engine is
    /// read-only so a rejected request has no partial side effects.
    pub fn validate(&self, catalog: &SchemaCatalog) -> Result<()> {
        match self.operation {
            AnalyticsOperation::Centrality => {
                self.algorithm.parse::<CentralityAlgorithm>()?;
                if self.limit < 1 || self.limit > MAX_RESULT_LIMIT {
                    return Err(OrgGraphError::validation(format!(
                        "limit must be within [1, {}], got {}",
                        MAX_RESULT_LIMIT, self.limit
                    )));
                }
            }
            AnalyticsOperation::Community => {
                self.algorithm.parse::<CommunityAlgorithm>()?;
                if self.min_community_size < 1 {
                    return Err(OrgGraphError::validation(format!(
                        "min_community_size must be >= 1, got {}",
                        self.min_community_size
                    )));
                }
                if self.max_communities < 1 || self.max_communities > MAX_COMMUNITIES {
                    return Err(OrgGraphError::validation(format!(
                        "max_communities must be within [1, {}], got {}",
                        MAX_COMMUNITIES, self.max_communities
                    )));
                }
            }
            AnalyticsOperation::Stats => {
                if self.sample_size < MIN_SAMPLE_SIZE || self.sample_size > MAX_SAMPLE_SIZE {
                    return Err(OrgGraphError::validation(format!(
                        "sample_size must be within [{}, {}], got {}",
                        MIN_SAMPLE_SIZE, MAX_SAMPLE_SIZE, self.sample_size
                    )));
                }
            }
        }

        if let Some(label) = &self.node_type {
            if !catalog.contains_label(label) {
                return Err(OrgGraphError::validation(format!(
                    "unknown node label '{}', known labels: {:?}",
                    label, catalog.node_labels
                )));
            }
        }
        if let Some(relationship_type) = &self.relationship_type {
            if !catalog.contains_relationship_type(relationship_type) {
                return Err(OrgGraphError::validation(format!(
                    "unknown relationship type '{}', known types: {:?}",
                    relationship_type, catalog.relationship_types
                )));
            }
        }

        Ok(())
    }

    /// Canonical representation with stable field ordering, the input to
    /// cache fingerprinting.
    pub fn canonical_string(&self) -> String {
        format!(
            "operation={}|algorithm={}|node_type={}|relationship_type={}|limit={}|sample_size={}|min_community_size={}|max_communities={}",
            self.operation,
            self.algorithm,
            self.node_type.as_deref().unwrap_or("-"),
            self.relationship_type.as_deref().unwrap_or("-"),
            self.limit,
            self.sample_size,
            self.min_community_size,
            self.max_communities,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_algorithm_is_rejected() {
        let catalog = SchemaCatalog::default();
        let request = AnalyticsRequest::centrality("eigenvector", None, 10);
        assert!(matches!(
            request.validate(&catalog),
            Err(OrgGraphError::Validation(_))
        ));
    }

    #[test]
    fn limit_bounds_are_inclusive() {
        let catalog = SchemaCatalog::default();
        assert!(AnalyticsRequest::centrality("degree", None, 1)
            .validate(&catalog)
            .is_ok());
        assert!(AnalyticsRequest::centrality("degree", None, 50)
            .validate(&catalog)
            .is_ok());
        assert!(AnalyticsRequest::centrality("degree", None, 0)
            .validate(&catalog)
            .is_err());
        assert!(AnalyticsRequest::centrality("degree", None, 51)
            .validate(&catalog)
            .is_err());
    }

    #[test]
    fn sample_size_boundaries() {
        let catalog = SchemaCatalog::default();
        assert!(AnalyticsRequest::stats(None, None, 9).validate(&catalog).is_err());
        assert!(AnalyticsRequest::stats(None, None, 10).validate(&catalog).is_ok());
        assert!(AnalyticsRequest::stats(None, None, 5000).validate(&catalog).is_ok());
        assert!(AnalyticsRequest::stats(None, None, 5001).validate(&catalog).is_err());
    }

    #[test]
    fn scope_filters_must_be_known() {
        let catalog = SchemaCatalog::default();
        let request = AnalyticsRequest::centrality("degree", Some("Person".into()), 10);
        assert!(request.validate(&catalog).is_ok());

        let request = AnalyticsRequest::centrality("degree", Some("Unknown".into()), 10);
        assert!(request.validate(&catalog).is_err());

        let request = AnalyticsRequest::stats(None, Some("MANAGES".into()), 100);
        assert!(request.validate(&catalog).is_err());
    }

    #[test]
    fn canonical_string_is_stable() {
        let a = AnalyticsRequest::community("label_propagation", Some("Team".into()), 2, 20);
        let b = AnalyticsRequest::community("label_propagation", Some("Team".into()), 2, 20);
        assert_eq!(a.canonical_string(), b.canonical_string());

        let c = AnalyticsRequest::community("label_propagation", Some("Team".into()), 3, 20);
        assert_ne!(a.canonical_string(), c.canonical_string());
    }
}
