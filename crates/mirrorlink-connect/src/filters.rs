//! Topic, group, and config-property filters
//!
//! All three are driven by include/exclude lists of anchored regular
//! expressions: a name must match some include pattern and no exclude
//! pattern. Exclude always wins. An empty include list matches nothing.

use regex::Regex;

use crate::error::{ConnectError, Result};

/// Topic include pattern used when none is configured
pub const DEFAULT_TOPICS_INCLUDE: &[&str] = &[".*"];

/// Topics never mirrored unless the operator overrides the exclude list
pub const DEFAULT_TOPICS_EXCLUDE: &[&str] = &[r".*[\-\.]internal", r".*\.replica", "__.*"];

/// Group include pattern used when none is configured
pub const DEFAULT_GROUPS_INCLUDE: &[&str] = &[".*"];

/// Groups never checkpointed unless the operator overrides the exclude list
pub const DEFAULT_GROUPS_EXCLUDE: &[&str] = &["console-consumer-.*", "connect-.*", "__.*"];

/// Topic configuration properties never propagated to the target.
/// User-supplied excludes extend this baseline, they do not replace it.
pub const DEFAULT_CONFIG_PROPERTIES_EXCLUDE: &[&str] = &[
    r"follower\.replication\.throttled\.replicas",
    r"leader\.replication\.throttled\.replicas",
    r"message\.timestamp\.difference\.max\.ms",
    r"message\.timestamp\.type",
    r"unclean\.leader\.election\.enable",
    r"min\.insync\.replicas",
];

/// Compile patterns so each must match the whole name, not a substring
fn compile_anchored(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{p})$"))
                .map_err(|e| ConnectError::config(format!("invalid filter pattern '{p}': {e}")))
        })
        .collect()
}

fn matches_any(patterns: &[Regex], name: &str) -> bool {
    patterns.iter().any(|p| p.is_match(name))
}

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|s| s.to_string()).collect()
}

/// Decides which source topics are eligible for replication
#[derive(Debug, Clone)]
pub struct TopicFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl TopicFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_anchored(include)?,
            exclude: compile_anchored(exclude)?,
        })
    }

    /// Include everything except the default internal/replica exclusions
    pub fn default_filter() -> Self {
        Self::new(&to_owned(DEFAULT_TOPICS_INCLUDE), &to_owned(DEFAULT_TOPICS_EXCLUDE))
            .expect("default topic filter patterns are valid")
    }

    /// Match every topic
    pub fn allow_all() -> Self {
        Self::new(&to_owned(&[".*"]), &[]).expect("allow-all pattern is valid")
    }

    /// Match no topic (heartbeats may still be replicated via their bypass)
    pub fn deny_all() -> Self {
        Self::new(&[], &[]).expect("empty filter is valid")
    }

    pub fn should_replicate_topic(&self, topic: &str) -> bool {
        matches_any(&self.include, topic) && !matches_any(&self.exclude, topic)
    }
}

/// Decides which consumer groups are eligible for checkpointing
#[derive(Debug, Clone)]
pub struct GroupFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl GroupFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_anchored(include)?,
            exclude: compile_anchored(exclude)?,
        })
    }

    /// Include everything except transient console/runtime groups
    pub fn default_filter() -> Self {
        Self::new(&to_owned(DEFAULT_GROUPS_INCLUDE), &to_owned(DEFAULT_GROUPS_EXCLUDE))
            .expect("default group filter patterns are valid")
    }

    pub fn should_replicate_group(&self, group: &str) -> bool {
        matches_any(&self.include, group) && !matches_any(&self.exclude, group)
    }
}

/// Decides which topic configuration properties propagate to the target
///
/// Exclude-only: the baseline throttle/election/timestamp properties are
/// always excluded, and user patterns extend the baseline.
#[derive(Debug, Clone)]
pub struct ConfigPropertyFilter {
    baseline: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ConfigPropertyFilter {
    pub fn new(exclude: &[String]) -> Result<Self> {
        Ok(Self {
            baseline: compile_anchored(&to_owned(DEFAULT_CONFIG_PROPERTIES_EXCLUDE))?,
            exclude: compile_anchored(exclude)?,
        })
    }

    /// Baseline exclusions only
    pub fn default_filter() -> Self {
        Self::new(&[]).expect("baseline config property patterns are valid")
    }

    pub fn should_replicate_config_property(&self, property: &str) -> bool {
        !matches_any(&self.baseline, property) && !matches_any(&self.exclude, property)
    }
}
