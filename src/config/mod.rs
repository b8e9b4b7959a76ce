//! Stage configuration
//!
//! Loaded once at startup from a TOML file, then overridden from `PREPSYNC_*`
//! environment variables, validated, and handed to the coordinator. Nothing
//! reads configuration from global state.

pub mod list;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::error::{Error, Result};
use crate::model::{DomainChangeRule, NodeId};
use crate::preparation::PreparationConfig;
use crate::storage::{BackendType, StorageConfig};

/// Column index meaning "no domain-change rule configured"
pub const NO_RULE_INDEX: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub node_id: NodeId,

    /// Pause the platform may take between dependent operations, in ms
    #[serde(default)]
    pub dependence_wait_ms: u64,

    /// Delay held inside a guarded section after each deletion or action
    /// submission
    #[serde(with = "humantime_serde", default = "default_settle_delay")]
    pub settle_delay: Duration,

    /// Trigger expression for the scheduler; informational here
    #[serde(default)]
    pub trigger: Option<String>,

    /// Also drop the intermediate store keys when the stage terminates early
    #[serde(default)]
    pub purge_keys_on_terminate: bool,

    #[serde(default)]
    pub domain_change: DomainChangeConfig,

    #[serde(default)]
    pub store: StorageConfig,

    #[serde(default)]
    pub preparation: PreparationConfig,
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(1)
}

/// Parallel lists of column indices and the domain each column should get.
///
/// Both accept a TOML array or a comma separated string (`"3, 5"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainChangeConfig {
    #[serde(default = "default_idx", deserialize_with = "list::comma_list")]
    pub idx: Vec<i64>,

    #[serde(default, deserialize_with = "list::comma_list")]
    pub value: Vec<String>,
}

fn default_idx() -> Vec<i64> {
    vec![NO_RULE_INDEX]
}

impl Default for DomainChangeConfig {
    fn default() -> Self {
        Self {
            idx: default_idx(),
            value: Vec::new(),
        }
    }
}

impl DomainChangeConfig {
    fn is_unset(&self) -> bool {
        let no_idx = self.idx.is_empty() || self.idx == [NO_RULE_INDEX];
        let no_value = self.value.iter().all(|v| v.trim().is_empty());
        no_idx && no_value
    }

    /// Zip the parallel lists into rules, rejecting mismatched or invalid
    /// entries
    pub fn rules(&self) -> Result<Vec<DomainChangeRule>> {
        if self.is_unset() {
            return Ok(Vec::new());
        }

        if self.idx.len() != self.value.len() {
            return Err(Error::config(format!(
                "domain_change.idx has {} entries but domain_change.value has {}",
                self.idx.len(),
                self.value.len()
            )));
        }

        self.idx
            .iter()
            .zip(&self.value)
            .map(|(&idx, value)| {
                let column_index = usize::try_from(idx).map_err(|_| {
                    Error::config(format!("domain_change.idx contains negative index {}", idx))
                })?;
                let value = value.trim();
                if value.is_empty() {
                    return Err(Error::config(format!(
                        "domain_change.value for column {} is empty",
                        column_index
                    )));
                }
                Ok(DomainChangeRule::new(column_index, value))
            })
            .collect()
    }
}

impl StageConfig {
    /// Minimal configuration for one node with in-memory store defaults
    pub fn for_node(node_id: NodeId) -> Self {
        Self {
            node_id,
            dependence_wait_ms: 0,
            settle_delay: default_settle_delay(),
            trigger: None,
            purge_keys_on_terminate: false,
            domain_change: DomainChangeConfig::default(),
            store: StorageConfig::default(),
            preparation: PreparationConfig::default(),
        }
    }

    /// Load from a TOML file, apply environment overrides and validate
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::parse(&content)?;
        config.merge_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// The domain-change index and value lists are replaced together: setting
    /// only one of them, or a value that does not parse, is a configuration
    /// error rather than a silent mix of file and environment entries.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(node) = parse_env(&lookup, "PREPSYNC_NODE_NO")? {
            self.node_id = node;
        }

        if let Some(wait) = parse_env(&lookup, "PREPSYNC_DEPENDENCE_WAIT")? {
            self.dependence_wait_ms = wait;
        }

        if let Some(ms) = parse_env(&lookup, "PREPSYNC_SETTLE_DELAY_MS")? {
            self.settle_delay = Duration::from_millis(ms);
        }

        match (
            lookup("PREPSYNC_DOMAIN_CHANGE_IDX"),
            lookup("PREPSYNC_DOMAIN_CHANGE_VALUE"),
        ) {
            (Some(idx), Some(value)) => {
                let idx = list::parse_csv::<i64>(&idx)
                    .map_err(|e| Error::config(format!("PREPSYNC_DOMAIN_CHANGE_IDX: {}", e)))?;
                let value = list::parse_csv::<String>(&value)
                    .map_err(|e| Error::config(format!("PREPSYNC_DOMAIN_CHANGE_VALUE: {}", e)))?;
                self.domain_change = DomainChangeConfig { idx, value };
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::config(
                    "PREPSYNC_DOMAIN_CHANGE_IDX and PREPSYNC_DOMAIN_CHANGE_VALUE must be set together",
                ));
            }
            (None, None) => {}
        }

        if let Some(trigger) = lookup("PREPSYNC_TRIGGER") {
            self.trigger = Some(trigger);
        }

        if let Some(url) = lookup("PREPSYNC_STORE_URL") {
            self.store.url = Some(url);
        }

        if let Some(url) = lookup("PREPSYNC_PREPARATION_URL") {
            self.preparation.base_url = url;
        }

        if let Some(token) = lookup("PREPSYNC_PREPARATION_TOKEN") {
            self.preparation.api_token = Some(token);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.domain_change.rules()?;

        if self.preparation.base_url.trim().is_empty() {
            return Err(Error::config("preparation.base_url must not be empty"));
        }

        if self.store.backend == BackendType::Redis && self.store.url.is_none() {
            return Err(Error::config("store.url is required for the redis backend"));
        }

        Ok(())
    }

    pub fn dependence_wait(&self) -> Duration {
        Duration::from_millis(self.dependence_wait_ms)
    }
}

/// Parse an optional numeric environment variable
fn parse_env<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::config(format!("{}: invalid value '{}': {}", key, raw, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
node_id = 2
dependence_wait_ms = 500
settle_delay = "250ms"
trigger = "0 0/5 * * * ?"

[domain_change]
idx = "3, 5"
value = "EMAIL, FR_POSTAL_CODE"

[store]
backend = "memory"

[preparation]
base_url = "http://dprep:8080"
timeout = "30s"
"#;

    #[test]
    fn test_parse_sample() {
        let config = StageConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.node_id, 2);
        assert_eq!(config.dependence_wait(), Duration::from_millis(500));
        assert_eq!(config.settle_delay, Duration::from_millis(250));
        assert_eq!(config.trigger.as_deref(), Some("0 0/5 * * * ?"));
        assert_eq!(config.preparation.timeout, Duration::from_secs(30));

        let rules = config.domain_change.rules().unwrap();
        assert_eq!(
            rules,
            vec![
                DomainChangeRule::new(3, "EMAIL"),
                DomainChangeRule::new(5, "FR_POSTAL_CODE"),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let config = StageConfig::parse("node_id = 0").unwrap();
        assert_eq!(config.settle_delay, Duration::from_secs(1));
        assert!(!config.purge_keys_on_terminate);
        assert!(config.domain_change.rules().unwrap().is_empty());
        assert_eq!(config.store.backend, BackendType::Memory);
        config.validate().unwrap();
    }

    #[test]
    fn test_array_form() {
        let config = StageConfig::parse(
            r#"
node_id = 1
[domain_change]
idx = [0]
value = ["Y"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.domain_change.rules().unwrap(),
            vec![DomainChangeRule::new(0, "Y")]
        );
    }

    #[test]
    fn test_mismatched_lists_rejected() {
        let rules = DomainChangeConfig {
            idx: vec![1, 2],
            value: vec!["A".into()],
        }
        .rules();
        assert!(rules.is_err());
    }

    #[test]
    fn test_negative_index_rejected() {
        let rules = DomainChangeConfig {
            idx: vec![-2],
            value: vec!["A".into()],
        }
        .rules();
        assert!(rules.unwrap_err().to_string().contains("negative"));
    }

    #[test]
    fn test_placeholder_rule_means_none() {
        let rules = DomainChangeConfig {
            idx: vec![NO_RULE_INDEX],
            value: vec![String::new()],
        }
        .rules()
        .unwrap();
        assert!(rules.is_empty());
    }

    fn lookup_from<'a>(env: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let env: HashMap<&str, &str> = env.iter().copied().collect();
        move |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_env_overrides() {
        let mut config = StageConfig::parse(SAMPLE).unwrap();
        config
            .merge_env_with(lookup_from(&[
                ("PREPSYNC_NODE_NO", "7"),
                ("PREPSYNC_DOMAIN_CHANGE_IDX", "1,2"),
                ("PREPSYNC_DOMAIN_CHANGE_VALUE", "A , B"),
                ("PREPSYNC_SETTLE_DELAY_MS", "10"),
            ]))
            .unwrap();

        assert_eq!(config.node_id, 7);
        assert_eq!(config.settle_delay, Duration::from_millis(10));
        assert_eq!(config.dependence_wait_ms, 500);
        assert_eq!(
            config.domain_change.rules().unwrap(),
            vec![DomainChangeRule::new(1, "A"), DomainChangeRule::new(2, "B")]
        );
    }

    #[test]
    fn test_unparsable_numeric_override_rejected() {
        let mut config = StageConfig::parse(SAMPLE).unwrap();
        let err = config
            .merge_env_with(lookup_from(&[("PREPSYNC_DEPENDENCE_WAIT", "not-a-number")]))
            .unwrap_err();
        assert!(err.to_string().contains("PREPSYNC_DEPENDENCE_WAIT"));
        assert_eq!(config.dependence_wait_ms, 500);
    }

    #[test]
    fn test_unparsable_domain_index_does_not_pair_env_values_with_file_indices() {
        let mut config = StageConfig::parse(SAMPLE).unwrap();
        let err = config
            .merge_env_with(lookup_from(&[
                ("PREPSYNC_DOMAIN_CHANGE_IDX", "0, x"),
                ("PREPSYNC_DOMAIN_CHANGE_VALUE", "PHONE, ZIP"),
            ]))
            .unwrap_err();
        assert!(err.to_string().contains("PREPSYNC_DOMAIN_CHANGE_IDX"));

        // File rules stay untouched
        assert_eq!(
            config.domain_change.rules().unwrap(),
            vec![
                DomainChangeRule::new(3, "EMAIL"),
                DomainChangeRule::new(5, "FR_POSTAL_CODE"),
            ]
        );
    }

    #[test]
    fn test_domain_values_without_indices_rejected() {
        let mut config = StageConfig::parse(SAMPLE).unwrap();
        let err = config
            .merge_env_with(lookup_from(&[("PREPSYNC_DOMAIN_CHANGE_VALUE", "PHONE, ZIP")]))
            .unwrap_err();
        assert!(err.to_string().contains("must be set together"));
    }

    #[test]
    fn test_redis_without_url_rejected() {
        let mut config = StageConfig::for_node(0);
        config.store.backend = BackendType::Redis;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = StageConfig::load(file.path()).await.unwrap();
        assert_eq!(config.preparation.base_url, "http://dprep:8080");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = StageConfig::load(Path::new("/nonexistent/prepsync.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
