//! Connector configuration
//!
//! Configs are serde structs (YAML loadable) that can also be built from the
//! flat string properties the host runtime hands to `start`. Missing keys
//! fall back to defaults; malformed values are fatal configuration errors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

use crate::assignment::{encode_consumer_groups, encode_topic_partitions};
use crate::error::{ConnectError, Result};
use crate::filters::{
    ConfigPropertyFilter, GroupFilter, TopicFilter, DEFAULT_GROUPS_EXCLUDE,
    DEFAULT_GROUPS_INCLUDE, DEFAULT_TOPICS_EXCLUDE, DEFAULT_TOPICS_INCLUDE,
};
use crate::policy::{ReplicationPolicy, DEFAULT_SEPARATOR};
use crate::types::{SourceAndTarget, TopicPartition};

// Property keys of the host runtime's flat configuration contract.
pub const SOURCE_CLUSTER_ALIAS: &str = "source.cluster.alias";
pub const TARGET_CLUSTER_ALIAS: &str = "target.cluster.alias";
pub const ENABLED: &str = "enabled";
pub const REPLICATION_POLICY: &str = "replication.policy";
pub const REPLICATION_POLICY_SEPARATOR: &str = "replication.policy.separator";
pub const REPLICATION_FACTOR: &str = "replication.factor";
pub const TOPICS_INCLUDE: &str = "topics";
pub const TOPICS_EXCLUDE: &str = "topics.exclude";
pub const GROUPS_INCLUDE: &str = "groups";
pub const GROUPS_EXCLUDE: &str = "groups.exclude";
pub const CONFIG_PROPERTIES_EXCLUDE: &str = "config.properties.exclude";
pub const REFRESH_TOPICS_INTERVAL_SECONDS: &str = "refresh.topics.interval.seconds";
pub const REFRESH_GROUPS_INTERVAL_SECONDS: &str = "refresh.groups.interval.seconds";
pub const SYNC_TOPIC_ACLS_ENABLED: &str = "sync.topic.acls.enabled";
pub const SYNC_TOPIC_ACLS_INTERVAL_SECONDS: &str = "sync.topic.acls.interval.seconds";
pub const SYNC_TOPIC_CONFIGS_ENABLED: &str = "sync.topic.configs.enabled";
pub const SYNC_TOPIC_CONFIGS_INTERVAL_SECONDS: &str = "sync.topic.configs.interval.seconds";
pub const EMIT_CHECKPOINTS_ENABLED: &str = "emit.checkpoints.enabled";
pub const EMIT_CHECKPOINTS_INTERVAL_SECONDS: &str = "emit.checkpoints.interval.seconds";
pub const ADMIN_TIMEOUT_MS: &str = "admin.timeout.ms";
pub const OFFSET_SYNCS_TOPIC_REPLICATION_FACTOR: &str = "offset.syncs.topic.replication.factor";
pub const CHECKPOINTS_TOPIC_REPLICATION_FACTOR: &str = "checkpoints.topic.replication.factor";

/// Task-config key carrying the CSV of assigned `topic-partition` tokens
pub const TASK_TOPIC_PARTITIONS: &str = "task.assigned.partitions";
/// Task-config key carrying the CSV of assigned consumer-group ids
pub const TASK_CONSUMER_GROUPS: &str = "task.assigned.groups";

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_replication_factor() -> i16 {
    -1
}

fn default_refresh_interval_secs() -> u64 {
    600
}

fn default_sync_interval_secs() -> u64 {
    600
}

fn default_admin_timeout_ms() -> u64 {
    60_000
}

fn default_emit_checkpoints_interval_ms() -> i64 {
    60_000
}

fn default_topics_include() -> Vec<String> {
    DEFAULT_TOPICS_INCLUDE.iter().map(|s| s.to_string()).collect()
}

fn default_topics_exclude() -> Vec<String> {
    DEFAULT_TOPICS_EXCLUDE.iter().map(|s| s.to_string()).collect()
}

fn default_groups_include() -> Vec<String> {
    DEFAULT_GROUPS_INCLUDE.iter().map(|s| s.to_string()).collect()
}

fn default_groups_exclude() -> Vec<String> {
    DEFAULT_GROUPS_EXCLUDE.iter().map(|s| s.to_string()).collect()
}

/// Which replication policy to construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Prefix mirrored names with the source alias
    #[default]
    Default,
    /// Keep topic names unchanged across clusters
    Identity,
}

/// Replication-policy selection plus separator
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReplicationPolicyConfig {
    #[serde(default)]
    pub kind: PolicyKind,

    /// Separator between the source alias and the topic name
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for ReplicationPolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::Default,
            separator: default_separator(),
        }
    }
}

impl ReplicationPolicyConfig {
    pub fn build(&self) -> ReplicationPolicy {
        match self.kind {
            PolicyKind::Default => ReplicationPolicy::Default {
                separator: self.separator.clone(),
            },
            PolicyKind::Identity => ReplicationPolicy::Identity,
        }
    }
}

/// Configuration of the topic-replication (source) connector
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct MirrorSourceConfig {
    /// Alias of the upstream cluster records are read from
    #[validate(length(min = 1, message = "source cluster alias must not be empty"))]
    pub source_cluster_alias: String,

    /// Alias of the downstream cluster mirrored topics are created on
    #[validate(length(min = 1, message = "target cluster alias must not be empty"))]
    pub target_cluster_alias: String,

    /// Whether this replication flow is active at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub replication_policy: ReplicationPolicyConfig,

    /// Topic include patterns (anchored regexes)
    #[serde(default = "default_topics_include")]
    pub topics: Vec<String>,

    /// Topic exclude patterns; exclude wins over include
    #[serde(default = "default_topics_exclude")]
    pub topics_exclude: Vec<String>,

    /// Extra config-property exclude patterns on top of the baseline
    #[serde(default)]
    pub config_properties_exclude: Vec<String>,

    /// Replication factor for newly created mirrored topics; -1 asks for
    /// the broker default
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i16,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_topics_interval_seconds: u64,

    #[serde(default = "default_true")]
    pub sync_topic_acls_enabled: bool,

    #[serde(default = "default_sync_interval_secs")]
    pub sync_topic_acls_interval_seconds: u64,

    #[serde(default = "default_true")]
    pub sync_topic_configs_enabled: bool,

    #[serde(default = "default_sync_interval_secs")]
    pub sync_topic_configs_interval_seconds: u64,

    /// Wall-clock budget for each admin RPC / scheduled job
    #[serde(default = "default_admin_timeout_ms")]
    pub admin_timeout_ms: u64,

    #[serde(default = "default_replication_factor")]
    pub offset_syncs_topic_replication_factor: i16,
}

impl MirrorSourceConfig {
    /// Config with defaults for everything but the cluster aliases
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_cluster_alias: source.into(),
            target_cluster_alias: target.into(),
            enabled: true,
            replication_policy: ReplicationPolicyConfig::default(),
            topics: default_topics_include(),
            topics_exclude: default_topics_exclude(),
            config_properties_exclude: Vec::new(),
            replication_factor: default_replication_factor(),
            refresh_topics_interval_seconds: default_refresh_interval_secs(),
            sync_topic_acls_enabled: true,
            sync_topic_acls_interval_seconds: default_sync_interval_secs(),
            sync_topic_configs_enabled: true,
            sync_topic_configs_interval_seconds: default_sync_interval_secs(),
            admin_timeout_ms: default_admin_timeout_ms(),
            offset_syncs_topic_replication_factor: default_replication_factor(),
        }
    }

    /// Build from the host runtime's flat string properties
    pub fn from_props(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::new(
            require(props, SOURCE_CLUSTER_ALIAS)?,
            require(props, TARGET_CLUSTER_ALIAS)?,
        );
        config.enabled = parse_bool(props, ENABLED)?.unwrap_or(true);
        config.replication_policy = parse_policy(props)?;
        if let Some(topics) = parse_list(props, TOPICS_INCLUDE) {
            config.topics = topics;
        }
        if let Some(exclude) = parse_list(props, TOPICS_EXCLUDE) {
            config.topics_exclude = exclude;
        }
        if let Some(exclude) = parse_list(props, CONFIG_PROPERTIES_EXCLUDE) {
            config.config_properties_exclude = exclude;
        }
        if let Some(rf) = parse_i16(props, REPLICATION_FACTOR)? {
            config.replication_factor = rf;
        }
        if let Some(secs) = parse_u64(props, REFRESH_TOPICS_INTERVAL_SECONDS)? {
            config.refresh_topics_interval_seconds = secs;
        }
        if let Some(enabled) = parse_bool(props, SYNC_TOPIC_ACLS_ENABLED)? {
            config.sync_topic_acls_enabled = enabled;
        }
        if let Some(secs) = parse_u64(props, SYNC_TOPIC_ACLS_INTERVAL_SECONDS)? {
            config.sync_topic_acls_interval_seconds = secs;
        }
        if let Some(enabled) = parse_bool(props, SYNC_TOPIC_CONFIGS_ENABLED)? {
            config.sync_topic_configs_enabled = enabled;
        }
        if let Some(secs) = parse_u64(props, SYNC_TOPIC_CONFIGS_INTERVAL_SECONDS)? {
            config.sync_topic_configs_interval_seconds = secs;
        }
        if let Some(ms) = parse_u64(props, ADMIN_TIMEOUT_MS)? {
            config.admin_timeout_ms = ms;
        }
        if let Some(rf) = parse_i16(props, OFFSET_SYNCS_TOPIC_REPLICATION_FACTOR)? {
            config.offset_syncs_topic_replication_factor = rf;
        }
        config.validate_config()?;
        Ok(config)
    }

    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| ConnectError::config(e.to_string()))
    }

    pub fn source_and_target(&self) -> SourceAndTarget {
        SourceAndTarget::new(&self.source_cluster_alias, &self.target_cluster_alias)
    }

    pub fn replication_policy(&self) -> ReplicationPolicy {
        self.replication_policy.build()
    }

    pub fn topic_filter(&self) -> Result<TopicFilter> {
        TopicFilter::new(&self.topics, &self.topics_exclude)
    }

    pub fn config_property_filter(&self) -> Result<ConfigPropertyFilter> {
        ConfigPropertyFilter::new(&self.config_properties_exclude)
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_millis(self.admin_timeout_ms)
    }

    pub fn refresh_topics_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_topics_interval_seconds)
    }

    pub fn sync_topic_acls_interval(&self) -> Duration {
        Duration::from_secs(self.sync_topic_acls_interval_seconds)
    }

    pub fn sync_topic_configs_interval(&self) -> Duration {
        Duration::from_secs(self.sync_topic_configs_interval_seconds)
    }

    /// Single-partition compacted bookkeeping topic on the source cluster
    pub fn offset_syncs_topic(&self) -> String {
        format!(
            "mirrorlink-offset-syncs.{}.internal",
            self.target_cluster_alias
        )
    }

    /// Serialize one task's assignment into the string-map wire format
    pub fn task_config(&self, partitions: &[TopicPartition]) -> HashMap<String, String> {
        let mut props = self.common_task_props();
        props.insert(
            TASK_TOPIC_PARTITIONS.to_string(),
            encode_topic_partitions(partitions),
        );
        props
    }

    fn common_task_props(&self) -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert(
            SOURCE_CLUSTER_ALIAS.to_string(),
            self.source_cluster_alias.clone(),
        );
        props.insert(
            TARGET_CLUSTER_ALIAS.to_string(),
            self.target_cluster_alias.clone(),
        );
        props.insert(
            REPLICATION_POLICY_SEPARATOR.to_string(),
            self.replication_policy.separator.clone(),
        );
        props
    }
}

/// Configuration of the consumer-group checkpoint connector
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct MirrorCheckpointConfig {
    #[validate(length(min = 1, message = "source cluster alias must not be empty"))]
    pub source_cluster_alias: String,

    #[validate(length(min = 1, message = "target cluster alias must not be empty"))]
    pub target_cluster_alias: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub replication_policy: ReplicationPolicyConfig,

    #[serde(default = "default_topics_include")]
    pub topics: Vec<String>,

    #[serde(default = "default_topics_exclude")]
    pub topics_exclude: Vec<String>,

    /// Consumer-group include patterns (anchored regexes)
    #[serde(default = "default_groups_include")]
    pub groups: Vec<String>,

    #[serde(default = "default_groups_exclude")]
    pub groups_exclude: Vec<String>,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_groups_interval_seconds: u64,

    /// How often checkpoint records are emitted; a negative value disables
    /// checkpoint tasks entirely
    #[serde(default = "default_emit_checkpoints_interval_ms")]
    pub emit_checkpoints_interval_ms: i64,

    #[serde(default = "default_admin_timeout_ms")]
    pub admin_timeout_ms: u64,

    #[serde(default = "default_replication_factor")]
    pub checkpoints_topic_replication_factor: i16,
}

impl MirrorCheckpointConfig {
    /// Config with defaults for everything but the cluster aliases
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_cluster_alias: source.into(),
            target_cluster_alias: target.into(),
            enabled: true,
            replication_policy: ReplicationPolicyConfig::default(),
            topics: default_topics_include(),
            topics_exclude: default_topics_exclude(),
            groups: default_groups_include(),
            groups_exclude: default_groups_exclude(),
            refresh_groups_interval_seconds: default_refresh_interval_secs(),
            emit_checkpoints_interval_ms: default_emit_checkpoints_interval_ms(),
            admin_timeout_ms: default_admin_timeout_ms(),
            checkpoints_topic_replication_factor: default_replication_factor(),
        }
    }

    /// Build from the host runtime's flat string properties
    pub fn from_props(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::new(
            require(props, SOURCE_CLUSTER_ALIAS)?,
            require(props, TARGET_CLUSTER_ALIAS)?,
        );
        config.enabled = parse_bool(props, ENABLED)?.unwrap_or(true);
        config.replication_policy = parse_policy(props)?;
        if let Some(topics) = parse_list(props, TOPICS_INCLUDE) {
            config.topics = topics;
        }
        if let Some(exclude) = parse_list(props, TOPICS_EXCLUDE) {
            config.topics_exclude = exclude;
        }
        if let Some(groups) = parse_list(props, GROUPS_INCLUDE) {
            config.groups = groups;
        }
        if let Some(exclude) = parse_list(props, GROUPS_EXCLUDE) {
            config.groups_exclude = exclude;
        }
        if let Some(secs) = parse_u64(props, REFRESH_GROUPS_INTERVAL_SECONDS)? {
            config.refresh_groups_interval_seconds = secs;
        }
        // the disabled flag is encoded as a negative emission interval
        match parse_bool(props, EMIT_CHECKPOINTS_ENABLED)? {
            Some(false) => config.emit_checkpoints_interval_ms = -1,
            _ => {
                if let Some(secs) = parse_u64(props, EMIT_CHECKPOINTS_INTERVAL_SECONDS)? {
                    config.emit_checkpoints_interval_ms = (secs as i64).saturating_mul(1000);
                }
            }
        }
        if let Some(ms) = parse_u64(props, ADMIN_TIMEOUT_MS)? {
            config.admin_timeout_ms = ms;
        }
        if let Some(rf) = parse_i16(props, CHECKPOINTS_TOPIC_REPLICATION_FACTOR)? {
            config.checkpoints_topic_replication_factor = rf;
        }
        config.validate_config()?;
        Ok(config)
    }

    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| ConnectError::config(e.to_string()))
    }

    pub fn source_and_target(&self) -> SourceAndTarget {
        SourceAndTarget::new(&self.source_cluster_alias, &self.target_cluster_alias)
    }

    pub fn replication_policy(&self) -> ReplicationPolicy {
        self.replication_policy.build()
    }

    pub fn topic_filter(&self) -> Result<TopicFilter> {
        TopicFilter::new(&self.topics, &self.topics_exclude)
    }

    pub fn group_filter(&self) -> Result<GroupFilter> {
        GroupFilter::new(&self.groups, &self.groups_exclude)
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_millis(self.admin_timeout_ms)
    }

    pub fn refresh_groups_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_groups_interval_seconds)
    }

    pub fn emit_checkpoints_disabled(&self) -> bool {
        self.emit_checkpoints_interval_ms < 0
    }

    /// Single-partition compacted checkpoint topic on the target cluster
    pub fn checkpoints_topic(&self) -> String {
        format!("{}.checkpoints.internal", self.source_cluster_alias)
    }

    /// Serialize one task's group assignment into the string-map wire format
    pub fn task_config(&self, groups: &[String]) -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert(
            SOURCE_CLUSTER_ALIAS.to_string(),
            self.source_cluster_alias.clone(),
        );
        props.insert(
            TARGET_CLUSTER_ALIAS.to_string(),
            self.target_cluster_alias.clone(),
        );
        props.insert(
            REPLICATION_POLICY_SEPARATOR.to_string(),
            self.replication_policy.separator.clone(),
        );
        props.insert(
            TASK_CONSUMER_GROUPS.to_string(),
            encode_consumer_groups(groups),
        );
        props
    }
}

fn require(props: &HashMap<String, String>, key: &str) -> Result<String> {
    match props.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConnectError::config(format!(
            "missing required property '{key}'"
        ))),
    }
}

fn parse_bool(props: &HashMap<String, String>, key: &str) -> Result<Option<bool>> {
    props
        .get(key)
        .map(|v| {
            v.trim().parse::<bool>().map_err(|_| {
                ConnectError::config(format!("property '{key}' must be true or false, got '{v}'"))
            })
        })
        .transpose()
}

fn parse_u64(props: &HashMap<String, String>, key: &str) -> Result<Option<u64>> {
    props
        .get(key)
        .map(|v| {
            v.trim().parse::<u64>().map_err(|e| {
                ConnectError::config(format!("property '{key}' must be a number: {e}"))
            })
        })
        .transpose()
}

fn parse_i16(props: &HashMap<String, String>, key: &str) -> Result<Option<i16>> {
    props
        .get(key)
        .map(|v| {
            v.trim().parse::<i16>().map_err(|e| {
                ConnectError::config(format!("property '{key}' must be a number: {e}"))
            })
        })
        .transpose()
}

fn parse_list(props: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
    props.get(key).map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn parse_policy(props: &HashMap<String, String>) -> Result<ReplicationPolicyConfig> {
    let kind = match props.get(REPLICATION_POLICY).map(|s| s.trim()) {
        None | Some("default") => PolicyKind::Default,
        Some("identity") => PolicyKind::Identity,
        Some(other) => {
            return Err(ConnectError::config(format!(
                "unknown replication policy '{other}', expected 'default' or 'identity'"
            )))
        }
    };
    let separator = props
        .get(REPLICATION_POLICY_SEPARATOR)
        .cloned()
        .unwrap_or_else(default_separator);
    if separator.is_empty() {
        return Err(ConnectError::config(
            "replication policy separator must not be empty",
        ));
    }
    Ok(ReplicationPolicyConfig { kind, separator })
}
