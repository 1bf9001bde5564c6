//! External capabilities consumed by the connectors
//!
//! `AdminClient` is the surface over the brokers' admin RPCs; the connectors
//! only ever talk to clusters through it. `ConnectorContext` is the sliver
//! of the host runtime the connectors call back into. Both are object-safe
//! so hosts and tests can supply their own implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{AdminError, AdminResult};
use crate::types::{AclBinding, AclBindingFilter, NewTopic, TopicConfig, TopicDescription, TopicPartition};

/// Admin surface of one broker cluster
///
/// Mutating calls report per-resource outcomes so an existence conflict on
/// one topic never hides the result for another.
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// All topic names visible on the cluster
    async fn list_topics(&self) -> AdminResult<Vec<String>>;

    /// Name and partition count for each requested topic
    async fn describe_topics(&self, topics: &[String]) -> AdminResult<Vec<TopicDescription>>;

    /// Full configuration of each requested topic, with provenance
    async fn describe_topic_configs(
        &self,
        topics: &[String],
    ) -> AdminResult<HashMap<String, TopicConfig>>;

    /// ACL bindings matching the filter.
    ///
    /// Yields [`AdminError::SecurityDisabled`] when the cluster has no
    /// authorizer configured.
    async fn describe_acls(&self, filter: &AclBindingFilter) -> AdminResult<Vec<AclBinding>>;

    /// Create topics; one outcome per topic name
    async fn create_topics(&self, topics: Vec<NewTopic>) -> Vec<(String, AdminResult<()>)>;

    /// Grow topics to the given total partition counts; one outcome per topic
    async fn create_partitions(
        &self,
        partition_counts: HashMap<String, u32>,
    ) -> Vec<(String, AdminResult<()>)>;

    /// Upsert ACL bindings; one outcome per binding, keyed by resource name
    async fn create_acls(&self, bindings: Vec<AclBinding>) -> Vec<(String, AdminResult<()>)>;

    /// Replace topic configurations; one outcome per topic
    async fn alter_topic_configs(
        &self,
        configs: HashMap<String, TopicConfig>,
    ) -> Vec<(String, AdminResult<()>)>;

    /// Ids of all consumer groups on the cluster
    async fn list_consumer_groups(&self) -> AdminResult<Vec<String>>;

    /// Committed offsets of one consumer group
    async fn list_consumer_group_offsets(
        &self,
        group: &str,
    ) -> AdminResult<HashMap<TopicPartition, u64>>;

    /// Release the underlying connection; called exactly once at stop
    async fn close(&self) {}
}

/// Host-runtime callback surface
pub trait ConnectorContext: Send + Sync {
    /// Ask the host to re-request task configurations. Advisory: a dropped
    /// request is repaired by the next reconciliation tick.
    fn request_task_reconfiguration(&self);
}

/// Create a single-partition compacted bookkeeping topic, tolerating the
/// topic already existing.
pub async fn create_compacted_topic(
    admin: &dyn AdminClient,
    topic: &str,
    partitions: u32,
    replication_factor: i16,
) {
    let new_topic = NewTopic::new(topic, partitions, replication_factor)
        .with_config("cleanup.policy", "compact");
    for (name, outcome) in admin.create_topics(vec![new_topic]).await {
        match outcome {
            Ok(()) => info!("Created internal topic {}", name),
            Err(AdminError::TopicExists(_)) => {
                debug!("Internal topic {} already exists", name)
            }
            Err(e) => warn!("Could not create internal topic {}: {}", name, e),
        }
    }
}
