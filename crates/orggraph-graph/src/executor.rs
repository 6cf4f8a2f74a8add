use crate::query::GraphQuery;
use async_trait::async_trait;
use orggraph_core::{Record, Result};

/// Collaborator seam to the graph store. Implementations execute a
/// parameterized read-only query and return its rows; backend failures
/// surface as `OrgGraphError::Query` carrying the attempted query text.
#[async_trait]
pub trait GraphQueryExecutor: Send + Sync {
    async fn execute(&self, query: &GraphQuery) -> Result<Vec<Record>>;
}
