//! Common value types shared by the connectors and the admin capability
//!
//! Everything here is a plain value: cluster alias pairs, topic-partitions,
//! topic descriptions and configs, and the ACL binding model consumed from
//! the brokers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConnectError;

/// A pair of cluster aliases naming a replication flow
///
/// Aliases are short symbolic names used as topic-name prefixes on the
/// target cluster. Both must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceAndTarget {
    source: String,
    target: String,
}

impl SourceAndTarget {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for SourceAndTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// A topic name plus partition index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: u32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: u32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

impl FromStr for TopicPartition {
    type Err = ConnectError;

    /// Parse the `topic-partition` wire form. The topic itself may contain
    /// dashes, so the partition is the segment after the last dash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (topic, partition) = s
            .rsplit_once('-')
            .ok_or_else(|| ConnectError::config(format!("malformed topic-partition '{s}'")))?;
        if topic.is_empty() {
            return Err(ConnectError::config(format!(
                "malformed topic-partition '{s}': empty topic"
            )));
        }
        let partition = partition.parse::<u32>().map_err(|e| {
            ConnectError::config(format!("malformed topic-partition '{s}': {e}"))
        })?;
        Ok(Self::new(topic, partition))
    }
}

/// Description of a topic as reported by a broker: name and partition count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub name: String,
    pub partitions: u32,
}

impl TopicDescription {
    pub fn new(name: impl Into<String>, partitions: u32) -> Self {
        Self {
            name: name.into(),
            partitions,
        }
    }

    /// Expand into one [`TopicPartition`] per partition index
    pub fn topic_partitions(&self) -> impl Iterator<Item = TopicPartition> + '_ {
        (0..self.partitions).map(|p| TopicPartition::new(self.name.clone(), p))
    }
}

/// Request to create a topic on a cluster
///
/// A replication factor of `-1` asks for the broker default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: i16,
    pub configs: BTreeMap<String, String>,
}

impl NewTopic {
    pub fn new(name: impl Into<String>, partitions: u32, replication_factor: i16) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
            configs: BTreeMap::new(),
        }
    }

    pub fn with_configs(mut self, configs: BTreeMap<String, String>) -> Self {
        self.configs = configs;
        self
    }

    pub fn with_config(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(name.into(), value.into());
        self
    }
}

/// Provenance of a topic configuration entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Broker-wide default
    DefaultConfig,
    /// Static broker config file
    StaticBrokerConfig,
    /// Dynamic cluster-wide override
    DynamicBrokerConfig,
    /// Dynamic default broker override
    DynamicDefaultBrokerConfig,
    /// Explicitly set on the topic
    DynamicTopicConfig,
    /// Provenance not reported
    Unknown,
}

impl ConfigSource {
    /// Only entries explicitly set on the topic are candidates for
    /// propagation to the target cluster.
    pub fn is_explicitly_set(&self) -> bool {
        matches!(self, Self::DynamicTopicConfig)
    }
}

/// A single topic configuration entry with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
    pub source: ConfigSource,
}

impl ConfigEntry {
    /// A dynamically-set topic config entry (the common case when reading
    /// back configs that an operator set on a topic).
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source: ConfigSource::DynamicTopicConfig,
        }
    }

    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.source = source;
        self
    }
}

/// Ordered topic configuration as described by a broker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub entries: Vec<ConfigEntry>,
}

impl TopicConfig {
    pub fn new(entries: Vec<ConfigEntry>) -> Self {
        Self { entries }
    }

    /// Project to a name→value mapping, preserving the last write per name
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}

/// Resource kind an ACL binding applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Topic,
    Group,
    Cluster,
}

/// How an ACL resource name is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Literal,
    Prefixed,
}

/// Operation named by an ACL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclOperation {
    All,
    Read,
    Write,
    Create,
    Delete,
    Alter,
    Describe,
}

/// Whether an ACL entry allows or denies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclPermission {
    Allow,
    Deny,
}

/// A named resource pattern an ACL binding applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePattern {
    pub resource_type: ResourceType,
    pub name: String,
    pub pattern_type: PatternType,
}

impl ResourcePattern {
    pub fn new(resource_type: ResourceType, name: impl Into<String>, pattern_type: PatternType) -> Self {
        Self {
            resource_type,
            name: name.into(),
            pattern_type,
        }
    }
}

/// Principal–host–operation–permission quadruple of an ACL binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessControlEntry {
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission: AclPermission,
}

impl AccessControlEntry {
    pub fn new(
        principal: impl Into<String>,
        host: impl Into<String>,
        operation: AclOperation,
        permission: AclPermission,
    ) -> Self {
        Self {
            principal: principal.into(),
            host: host.into(),
            operation,
            permission,
        }
    }
}

/// An access-control binding as consumed from a broker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclBinding {
    pub pattern: ResourcePattern,
    pub entry: AccessControlEntry,
}

impl AclBinding {
    pub fn new(pattern: ResourcePattern, entry: AccessControlEntry) -> Self {
        Self { pattern, entry }
    }
}

/// Server-side filter for describing ACL bindings
///
/// `None` fields match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclBindingFilter {
    pub resource_type: Option<ResourceType>,
    pub pattern_type: Option<PatternType>,
    pub permission: Option<AclPermission>,
}

impl AclBindingFilter {
    /// Any topic resource, any pattern type, `ALLOW` entries only: the
    /// filter the ACL sync describes with.
    pub fn any_topic_allow() -> Self {
        Self {
            resource_type: Some(ResourceType::Topic),
            pattern_type: None,
            permission: Some(AclPermission::Allow),
        }
    }

    pub fn matches(&self, binding: &AclBinding) -> bool {
        self.resource_type
            .map_or(true, |t| binding.pattern.resource_type == t)
            && self
                .pattern_type
                .map_or(true, |p| binding.pattern.pattern_type == p)
            && self
                .permission
                .map_or(true, |p| binding.entry.permission == p)
    }
}
