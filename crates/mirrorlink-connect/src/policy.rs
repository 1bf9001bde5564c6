//! Replication policy: how a source topic is named on the target cluster
//!
//! The policy is a tagged value, not a trait hierarchy. The `Default` policy
//! prefixes the source alias (`us-west.orders`); `Identity` keeps names
//! unchanged (and only recognizes prefixes on heartbeat topics, so heartbeat
//! loops stay detectable); `Custom` carries caller-supplied functions whose
//! answers may be absent without breaking cycle detection.

use std::fmt;
use std::sync::Arc;

/// Name of the liveness topic the connectors emit and always replicate
pub const HEARTBEATS_TOPIC: &str = "heartbeats";

/// Suffix marking the connectors' own bookkeeping topics
pub const INTERNAL_TOPIC_SUFFIX: &str = ".internal";

/// Default separator between the source alias and the topic name
pub const DEFAULT_SEPARATOR: &str = ".";

/// Caller-supplied policy functions
///
/// Unset functions fall back to the `Default` policy behavior with the
/// configured separator. Any function may answer `None`; cycle detection
/// treats that as "no recognizable upstream".
pub struct CustomPolicy {
    pub separator: String,
    pub format_remote: Option<Box<dyn Fn(&str, &str) -> String + Send + Sync>>,
    pub topic_source: Option<Box<dyn Fn(&str) -> Option<String> + Send + Sync>>,
    pub upstream_topic: Option<Box<dyn Fn(&str) -> Option<String> + Send + Sync>>,
}

impl CustomPolicy {
    pub fn new() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            format_remote: None,
            topic_source: None,
            upstream_topic: None,
        }
    }
}

impl Default for CustomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CustomPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPolicy")
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

/// Maps source topic names onto the target cluster and back
#[derive(Debug, Clone)]
pub enum ReplicationPolicy {
    /// Prefix the source alias: `format_remote("us-west", "orders")` is
    /// `"us-west.orders"`
    Default { separator: String },
    /// Leave names unchanged; prefixes are only recognized on heartbeats
    Identity,
    /// Caller-supplied functions
    Custom(Arc<CustomPolicy>),
}

impl Default for ReplicationPolicy {
    fn default() -> Self {
        Self::Default {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Prefix segment before the first separator, if any
fn split_source<'a>(separator: &str, topic: &'a str) -> Option<&'a str> {
    topic.split_once(separator).map(|(source, _)| source)
}

/// Remainder after the first separator, if any
fn split_upstream<'a>(separator: &str, topic: &'a str) -> Option<&'a str> {
    topic.split_once(separator).map(|(_, upstream)| upstream)
}

/// Strip prefixes until no separator remains
fn strip_to_original<'a>(separator: &str, topic: &'a str) -> &'a str {
    let mut current = topic;
    while let Some(upstream) = split_upstream(separator, current) {
        if upstream == current {
            break;
        }
        current = upstream;
    }
    current
}

impl ReplicationPolicy {
    /// Policy with a non-default separator
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self::Default {
            separator: separator.into(),
        }
    }

    fn separator(&self) -> &str {
        match self {
            Self::Default { separator } => separator,
            Self::Identity => DEFAULT_SEPARATOR,
            Self::Custom(custom) => &custom.separator,
        }
    }

    /// Name of `topic` once mirrored from the `source` cluster
    pub fn format_remote(&self, source: &str, topic: &str) -> String {
        match self {
            Self::Default { separator } => format!("{source}{separator}{topic}"),
            Self::Identity => topic.to_string(),
            Self::Custom(custom) => match &custom.format_remote {
                Some(f) => f(source, topic),
                None => format!("{}{}{}", source, custom.separator, topic),
            },
        }
    }

    /// Alias of the cluster this topic was mirrored from, if recognizable
    pub fn topic_source(&self, topic: &str) -> Option<String> {
        match self {
            Self::Default { separator } => split_source(separator, topic).map(str::to_string),
            Self::Identity => {
                // Identity replication cannot tell a mirrored name from a
                // local one, except for heartbeats, which keep the
                // alias-prefixed form on every hop.
                if self.is_heartbeats_topic(topic) {
                    split_source(DEFAULT_SEPARATOR, topic).map(str::to_string)
                } else {
                    None
                }
            }
            Self::Custom(custom) => match &custom.topic_source {
                Some(f) => f(topic),
                None => split_source(&custom.separator, topic).map(str::to_string),
            },
        }
    }

    /// Topic name one replication hop upstream, if recognizable
    pub fn upstream_topic(&self, topic: &str) -> Option<String> {
        match self {
            Self::Default { separator } => split_upstream(separator, topic).map(str::to_string),
            Self::Identity => {
                if self.is_heartbeats_topic(topic) {
                    split_upstream(DEFAULT_SEPARATOR, topic).map(str::to_string)
                } else {
                    None
                }
            }
            Self::Custom(custom) => match &custom.upstream_topic {
                Some(f) => f(topic),
                None => split_upstream(&custom.separator, topic).map(str::to_string),
            },
        }
    }

    /// Strip upstream prefixes until a fixed point is reached
    pub fn original_topic(&self, topic: &str) -> String {
        let mut current = topic.to_string();
        while let Some(upstream) = self.upstream_topic(&current) {
            if upstream == current {
                break;
            }
            current = upstream;
        }
        current
    }

    /// Whether this is a heartbeat topic, possibly several hops downstream
    ///
    /// Heartbeats keep the alias-prefixed shape under every policy, so the
    /// check always parses with the separator directly.
    pub fn is_heartbeats_topic(&self, topic: &str) -> bool {
        strip_to_original(self.separator(), topic) == HEARTBEATS_TOPIC
    }

    /// Whether this is one of the connectors' own bookkeeping topics
    pub fn is_internal_topic(&self, topic: &str) -> bool {
        topic.ends_with(INTERNAL_TOPIC_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let policy = ReplicationPolicy::default();
        let remote = policy.format_remote("us-west", "orders");
        assert_eq!(remote, "us-west.orders");
        assert_eq!(policy.upstream_topic(&remote).as_deref(), Some("orders"));
        assert_eq!(policy.topic_source(&remote).as_deref(), Some("us-west"));
    }

    #[test]
    fn test_default_unprefixed_topic() {
        let policy = ReplicationPolicy::default();
        assert_eq!(policy.topic_source("orders"), None);
        assert_eq!(policy.upstream_topic("orders"), None);
        assert_eq!(policy.original_topic("orders"), "orders");
    }

    #[test]
    fn test_original_topic_strips_all_hops() {
        let policy = ReplicationPolicy::default();
        assert_eq!(policy.original_topic("a.b.orders"), "orders");
        assert_eq!(policy.original_topic("us-west.heartbeats"), "heartbeats");
    }

    #[test]
    fn test_custom_separator() {
        let policy = ReplicationPolicy::with_separator("__");
        let remote = policy.format_remote("west", "orders");
        assert_eq!(remote, "west__orders");
        assert_eq!(policy.upstream_topic(&remote).as_deref(), Some("orders"));
        // a dot is no longer a separator
        assert_eq!(policy.topic_source("west.orders"), None);
    }

    #[test]
    fn test_heartbeats_recognition() {
        let policy = ReplicationPolicy::default();
        assert!(policy.is_heartbeats_topic("heartbeats"));
        assert!(policy.is_heartbeats_topic("us-west.heartbeats"));
        assert!(policy.is_heartbeats_topic("a.b.heartbeats"));
        assert!(!policy.is_heartbeats_topic("orders"));
        assert!(!policy.is_heartbeats_topic("heartbeats.orders"));
    }

    #[test]
    fn test_internal_topics() {
        let policy = ReplicationPolicy::default();
        assert!(policy.is_internal_topic("us-west.checkpoints.internal"));
        assert!(policy.is_internal_topic("mirrorlink-offset-syncs.us-east.internal"));
        assert!(!policy.is_internal_topic("heartbeats"));
        assert!(!policy.is_internal_topic("orders"));
    }

    #[test]
    fn test_identity_keeps_names() {
        let policy = ReplicationPolicy::Identity;
        assert_eq!(policy.format_remote("us-west", "orders"), "orders");
        // ordinary topics have no recognizable upstream
        assert_eq!(policy.topic_source("us-east.orders"), None);
        assert_eq!(policy.upstream_topic("us-east.orders"), None);
        // heartbeats keep their prefix chain
        assert_eq!(
            policy.topic_source("us-east.heartbeats").as_deref(),
            Some("us-east")
        );
        assert_eq!(
            policy.upstream_topic("us-east.heartbeats").as_deref(),
            Some("heartbeats")
        );
    }

    #[test]
    fn test_custom_fallbacks_behave_like_default() {
        let policy = ReplicationPolicy::Custom(Arc::new(CustomPolicy::new()));
        assert_eq!(policy.format_remote("west", "orders"), "west.orders");
        assert_eq!(policy.topic_source("west.orders").as_deref(), Some("west"));
    }

    #[test]
    fn test_custom_overrides_win() {
        let mut custom = CustomPolicy::new();
        custom.upstream_topic = Some(Box::new(|_| None));
        let policy = ReplicationPolicy::Custom(Arc::new(custom));
        assert_eq!(policy.upstream_topic("west.orders"), None);
        // original_topic terminates even though upstream never answers
        assert_eq!(policy.original_topic("west.orders"), "west.orders");
    }
}
