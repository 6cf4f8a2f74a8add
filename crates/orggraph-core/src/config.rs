use crate::error::{OrgGraphError, Result};
use crate::request::{MAX_COMMUNITIES, MAX_RESULT_LIMIT, MAX_SAMPLE_SIZE, MIN_SAMPLE_SIZE};
use crate::schema::{default_node_labels, default_relationship_types, SchemaCatalog};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Engine configuration. Loaded from TOML, then overridden by `ORGGRAPH_*`
/// environment variables, then validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Default top-N size for centrality rankings.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Default node sample size for sampled statistics.
    #[serde(default = "default_sample_size")]
    pub default_sample_size: usize,

    /// Default minimum community size; smaller clusters are dropped.
    #[serde(default = "default_min_community_size")]
    pub default_min_community_size: usize,

    /// Default cap on the number of communities returned.
    #[serde(default = "default_max_communities")]
    pub default_max_communities: usize,

    /// Result cache entry lifetime in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// Result cache capacity; the strict-LRU victim is evicted beyond this.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Wall-clock budget per analytics call in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Known labels and relationship types (scope-filter allow-list).
    #[serde(default)]
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_labels")]
    pub node_labels: Vec<String>,

    #[serde(default = "default_types")]
    pub relationship_types: Vec<String>,
}

fn default_limit() -> usize {
    10
}

fn default_sample_size() -> usize {
    1000
}

fn default_min_community_size() -> usize {
    2
}

fn default_max_communities() -> usize {
    20
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_labels() -> Vec<String> {
    default_node_labels().into_iter().map(String::from).collect()
}

fn default_types() -> Vec<String> {
    default_relationship_types()
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            node_labels: default_labels(),
            relationship_types: default_types(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_sample_size: default_sample_size(),
            default_min_community_size: default_min_community_size(),
            default_max_communities: default_max_communities(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_max_entries: default_cache_max_entries(),
            timeout_seconds: default_timeout_seconds(),
            schema: SchemaConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load from a TOML file, apply environment overrides, validate.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: AnalyticsConfig = toml::from_str(&raw)
            .map_err(|e| OrgGraphError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override numeric knobs from `ORGGRAPH_*` environment variables.
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        override_usize("ORGGRAPH_DEFAULT_LIMIT", &mut self.default_limit);
        override_usize("ORGGRAPH_SAMPLE_SIZE", &mut self.default_sample_size);
        override_usize("ORGGRAPH_CACHE_MAX_ENTRIES", &mut self.cache_max_entries);
        override_u64("ORGGRAPH_CACHE_TTL_SECONDS", &mut self.cache_ttl_seconds);
        override_u64("ORGGRAPH_TIMEOUT_SECONDS", &mut self.timeout_seconds);
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit < 1 || self.default_limit > MAX_RESULT_LIMIT {
            return Err(OrgGraphError::Config(format!(
                "default_limit must be within [1, {}], got {}",
                MAX_RESULT_LIMIT, self.default_limit
            )));
        }
        if self.default_sample_size < MIN_SAMPLE_SIZE || self.default_sample_size > MAX_SAMPLE_SIZE {
            return Err(OrgGraphError::Config(format!(
                "default_sample_size must be within [{}, {}], got {}",
                MIN_SAMPLE_SIZE, MAX_SAMPLE_SIZE, self.default_sample_size
            )));
        }
        if self.default_min_community_size < 1 {
            return Err(OrgGraphError::Config(
                "default_min_community_size must be >= 1".to_string(),
            ));
        }
        if self.default_max_communities < 1 || self.default_max_communities > MAX_COMMUNITIES {
            return Err(OrgGraphError::Config(format!(
                "default_max_communities must be within [1, {}], got {}",
                MAX_COMMUNITIES, self.default_max_communities
            )));
        }
        if self.cache_max_entries == 0 {
            return Err(OrgGraphError::Config(
                "cache_max_entries must be > 0".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(OrgGraphError::Config(
                "timeout_seconds must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn catalog(&self) -> SchemaCatalog {
        SchemaCatalog::new(
            self.schema.node_labels.iter().cloned(),
            self.schema.relationship_types.iter().cloned(),
        )
    }
}

fn override_usize(var: &str, target: &mut usize) {
    if let Ok(value) = std::env::var(var) {
        match value.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var, value = %value, "ignoring unparseable environment override"),
        }
    }
}

fn override_u64(var: &str, target: &mut u64) {
    if let Ok(value) = std::env::var(var) {
        match value.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var, value = %value, "ignoring unparseable environment override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.cache_max_entries, 100);
        assert_eq!(config.default_sample_size, 1000);
    }

    #[test]
    fn toml_round_trip_with_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cache_ttl_seconds = 60

[schema]
node_labels = ["Person", "Robot"]
"#
        )
        .unwrap();

        let config = AnalyticsConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.cache_ttl_seconds, 60);
        assert_eq!(config.default_limit, 10);
        assert!(config.catalog().contains_label("Robot"));
        // relationship_types fall back to the organizational defaults
        assert!(config.catalog().contains_relationship_type("REPORTS_TO"));
    }

    #[test]
    fn out_of_range_config_is_rejected() {
        let mut config = AnalyticsConfig::default();
        config.default_sample_size = 5001;
        assert!(config.validate().is_err());

        let mut config = AnalyticsConfig::default();
        config.cache_max_entries = 0;
        assert!(config.validate().is_err());
    }
}
