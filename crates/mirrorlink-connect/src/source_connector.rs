//! Topic-replication connector: discovery, reconciliation, and sync jobs
//!
//! The connector periodically discovers which source topic-partitions
//! should exist on the target cluster, creates or grows the mirrored
//! topics, and keeps topic configurations and topic ACLs in sync. All jobs
//! run serialized on the connector's scheduler; discovery state is
//! published by whole-`Arc` replacement so host threads always read a
//! consistent snapshot.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::admin::{create_compacted_topic, AdminClient, ConnectorContext};
use crate::assignment::round_robin_group;
use crate::config::{MirrorSourceConfig, SYNC_TOPIC_ACLS_ENABLED};
use crate::error::{AdminError, Result};
use crate::filters::{ConfigPropertyFilter, TopicFilter};
use crate::policy::ReplicationPolicy;
use crate::scheduler::Scheduler;
use crate::types::{
    AccessControlEntry, AclBinding, AclBindingFilter, AclOperation, AclPermission, NewTopic,
    PatternType, ResourcePattern, ResourceType, SourceAndTarget, TopicConfig, TopicPartition,
};

/// Control plane of one source→target topic-replication flow
pub struct MirrorSourceConnector {
    name: String,
    config: MirrorSourceConfig,
    source_and_target: SourceAndTarget,
    replication_policy: ReplicationPolicy,
    topic_filter: TopicFilter,
    config_property_filter: ConfigPropertyFilter,
    source_admin: Arc<dyn AdminClient>,
    target_admin: Arc<dyn AdminClient>,
    context: Arc<dyn ConnectorContext>,
    known_source_topic_partitions: RwLock<Arc<Vec<TopicPartition>>>,
    known_target_topic_partitions: RwLock<Arc<Vec<TopicPartition>>>,
    no_acl_authorizer: AtomicBool,
    scheduler: Mutex<Option<Scheduler>>,
}

impl MirrorSourceConnector {
    /// Build the connector from its config, deriving policy and filters.
    ///
    /// Fails fast on configuration errors (empty aliases, bad filter
    /// patterns); those must not survive into a running connector.
    pub fn new(
        config: MirrorSourceConfig,
        source_admin: Arc<dyn AdminClient>,
        target_admin: Arc<dyn AdminClient>,
        context: Arc<dyn ConnectorContext>,
    ) -> Result<Self> {
        config.validate_config()?;
        let replication_policy = config.replication_policy();
        let topic_filter = config.topic_filter()?;
        let config_property_filter = config.config_property_filter()?;
        Ok(Self::from_parts(
            config,
            replication_policy,
            topic_filter,
            config_property_filter,
            source_admin,
            target_admin,
            context,
        ))
    }

    /// Assemble the connector from pre-built parts. Lets callers supply a
    /// custom replication policy or hand-rolled filters.
    pub fn from_parts(
        config: MirrorSourceConfig,
        replication_policy: ReplicationPolicy,
        topic_filter: TopicFilter,
        config_property_filter: ConfigPropertyFilter,
        source_admin: Arc<dyn AdminClient>,
        target_admin: Arc<dyn AdminClient>,
        context: Arc<dyn ConnectorContext>,
    ) -> Self {
        let source_and_target = config.source_and_target();
        Self {
            name: format!("MirrorSourceConnector({source_and_target})"),
            config,
            source_and_target,
            replication_policy,
            topic_filter,
            config_property_filter,
            source_admin,
            target_admin,
            context,
            known_source_topic_partitions: RwLock::new(Arc::new(Vec::new())),
            known_target_topic_partitions: RwLock::new(Arc::new(Vec::new())),
            no_acl_authorizer: AtomicBool::new(false),
            scheduler: Mutex::new(None),
        }
    }

    /// Schedule the connector's jobs. Must run inside a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if !self.config.enabled {
            info!("{} is disabled, not starting", self.name);
            return Ok(());
        }
        let scheduler = Scheduler::new(self.name.clone(), self.config.admin_timeout());

        let connector = Arc::clone(self);
        scheduler.execute(
            move || {
                let connector = Arc::clone(&connector);
                async move { connector.create_offset_syncs_topic().await }
            },
            "creating upstream offset-syncs topic",
        );

        let connector = Arc::clone(self);
        scheduler.execute(
            move || {
                let connector = Arc::clone(&connector);
                async move { connector.refresh_topic_partitions().await }
            },
            "loading initial set of topic-partitions",
        );

        let connector = Arc::clone(self);
        scheduler.schedule_repeating_delayed(
            move || {
                let connector = Arc::clone(&connector);
                async move { connector.refresh_topic_partitions().await }
            },
            self.config.refresh_topics_interval(),
            "refreshing topics",
        );

        if self.config.sync_topic_acls_enabled {
            let connector = Arc::clone(self);
            scheduler.schedule_repeating(
                move || {
                    let connector = Arc::clone(&connector);
                    async move { connector.sync_topic_acls().await }
                },
                self.config.sync_topic_acls_interval(),
                "syncing topic ACLs",
            );
        }

        if self.config.sync_topic_configs_enabled {
            let connector = Arc::clone(self);
            scheduler.schedule_repeating(
                move || {
                    let connector = Arc::clone(&connector);
                    async move { connector.sync_topic_configs().await }
                },
                self.config.sync_topic_configs_interval(),
                "syncing topic configs",
            );
        }

        *self.scheduler.lock() = Some(scheduler);
        info!("Started {}", self.name);
        Ok(())
    }

    /// Close the scheduler, then both admin clients.
    pub async fn stop(&self) {
        if !self.config.enabled {
            return;
        }
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.close().await;
        }
        self.source_admin.close().await;
        self.target_admin.close().await;
        info!(
            "Stopped {} with {} known topic-partitions",
            self.name,
            self.known_source_topic_partitions.read().len()
        );
    }

    /// Distribute the known source topic-partitions over at most
    /// `max_tasks` task configurations.
    pub fn task_configs(&self, max_tasks: usize) -> Vec<HashMap<String, String>> {
        let known = self.known_source_topic_partitions.read().clone();
        if !self.config.enabled || known.is_empty() {
            return Vec::new();
        }
        round_robin_group(&known, max_tasks)
            .iter()
            .map(|partitions| self.config.task_config(partitions))
            .collect()
    }

    /// Snapshot of the source topic-partitions found by the last tick
    pub fn known_source_topic_partitions(&self) -> Arc<Vec<TopicPartition>> {
        self.known_source_topic_partitions.read().clone()
    }

    /// Snapshot of the target topic-partitions found by the last tick
    pub fn known_target_topic_partitions(&self) -> Arc<Vec<TopicPartition>> {
        self.known_target_topic_partitions.read().clone()
    }

    /// Seed the discovery state without running a tick (testing)
    pub fn set_known_source_topic_partitions(&self, partitions: Vec<TopicPartition>) {
        *self.known_source_topic_partitions.write() = Arc::new(partitions);
    }

    /// Mirrored name of `topic` on the target cluster
    pub fn format_remote_topic(&self, topic: &str) -> String {
        self.replication_policy
            .format_remote(self.source_and_target.source(), topic)
    }

    /// Whether replicating `topic` would feed the target's own topics back
    /// to itself through the mirror.
    ///
    /// Walks the upstream-prefix chain; terminates with `false` whenever
    /// the policy cannot answer, so irregular custom policies never fault
    /// the reconciler.
    pub fn is_cycle(&self, topic: &str) -> bool {
        let mut current = topic.to_string();
        loop {
            let Some(source) = self.replication_policy.topic_source(&current) else {
                return false;
            };
            if source == self.source_and_target.target() {
                return true;
            }
            match self.replication_policy.upstream_topic(&current) {
                Some(upstream) if upstream != current => current = upstream,
                _ => return false,
            }
        }
    }

    /// Whether `topic` is eligible for replication.
    ///
    /// Heartbeat topics bypass the user filter so liveness propagates
    /// through chained mirrors, but a heartbeat whose prefix chain passes
    /// through the target cluster is still rejected.
    pub fn should_replicate_topic(&self, topic: &str) -> bool {
        (self.topic_filter.should_replicate_topic(topic)
            || self.replication_policy.is_heartbeats_topic(topic))
            && !self.replication_policy.is_internal_topic(topic)
            && !self.is_cycle(topic)
    }

    /// Whether an ACL binding is eligible for replication: everything but
    /// `ALLOW WRITE`. The mirror must not be writable by source principals.
    pub fn should_replicate_acl(&self, binding: &AclBinding) -> bool {
        !(binding.entry.permission == AclPermission::Allow
            && binding.entry.operation == AclOperation::Write)
    }

    /// One reconciliation tick: discover both clusters and, when the source
    /// set changed or the target is missing partitions, converge the target
    /// and ask the host for new task configs.
    pub async fn refresh_topic_partitions(&self) -> Result<()> {
        let source_topic_partitions = self.find_source_topic_partitions().await?;
        let target_topic_partitions = self.find_target_topic_partitions().await?;

        let source_set: HashSet<&TopicPartition> = source_topic_partitions.iter().collect();
        let known_source = self.known_source_topic_partitions.read().clone();
        let known_source_set: HashSet<&TopicPartition> = known_source.iter().collect();

        // partitions the target already mirrors, mapped back to their
        // upstream names for comparison against the source set
        let upstreamed_target: HashSet<TopicPartition> = target_topic_partitions
            .iter()
            .filter_map(|tp| {
                self.replication_policy
                    .upstream_topic(&tp.topic)
                    .map(|topic| TopicPartition::new(topic, tp.partition))
            })
            .collect();

        let missing_on_target: Vec<&TopicPartition> = source_topic_partitions
            .iter()
            .filter(|tp| !upstreamed_target.contains(*tp))
            .collect();

        *self.known_target_topic_partitions.write() = Arc::new(target_topic_partitions);

        // Topic-partitions present only on the target never trigger
        // reconfiguration; that would oscillate whenever the target is
        // ahead of the source.
        if known_source_set == source_set && missing_on_target.is_empty() {
            return Ok(());
        }

        let new_count = source_set.difference(&known_source_set).count();
        let deleted_count = known_source_set.difference(&source_set).count();
        info!(
            "Found {} new topic-partitions on {}. Found {} deleted topic-partitions on {}. \
             Found {} topic-partitions missing on {}.",
            new_count,
            self.source_and_target.source(),
            deleted_count,
            self.source_and_target.source(),
            missing_on_target.len(),
            self.source_and_target.target(),
        );
        trace!(
            "Missing on {}: {:?}",
            self.source_and_target.target(),
            missing_on_target
        );

        *self.known_source_topic_partitions.write() = Arc::new(source_topic_partitions);
        self.compute_and_create_topic_partitions().await?;
        self.context.request_task_reconfiguration();
        Ok(())
    }

    /// Diff the known source and target sets and issue the create-topic and
    /// create-partitions calls needed to converge the target.
    pub async fn compute_and_create_topic_partitions(&self) -> Result<()> {
        let known_source = self.known_source_topic_partitions.read().clone();
        let known_target = self.known_target_topic_partitions.read().clone();

        let source_partition_counts = partition_counts(&known_source);
        let target_partition_counts = partition_counts(&known_target);

        let mut missing_topics: Vec<String> = Vec::new();
        let mut topics_to_grow: HashMap<String, u32> = HashMap::new();
        for (topic, &source_count) in &source_partition_counts {
            let remote = self.format_remote_topic(topic);
            match target_partition_counts.get(&remote) {
                None => missing_topics.push(topic.clone()),
                Some(&target_count) if source_count > target_count => {
                    topics_to_grow.insert(remote, source_count);
                }
                Some(_) => {}
            }
        }

        if !missing_topics.is_empty() {
            self.create_new_topics(&missing_topics, &source_partition_counts)
                .await?;
        }
        if !topics_to_grow.is_empty() {
            self.create_new_partitions(topics_to_grow).await;
        }
        Ok(())
    }

    /// All source partitions whose topic passes `should_replicate_topic`
    pub async fn find_source_topic_partitions(&self) -> Result<Vec<TopicPartition>> {
        let mut topics: Vec<String> = self
            .source_admin
            .list_topics()
            .await?
            .into_iter()
            .filter(|topic| self.should_replicate_topic(topic))
            .collect();
        topics.sort();
        self.describe_topic_partitions(self.source_admin.as_ref(), &topics)
            .await
    }

    /// All target partitions whose name the policy can map back upstream
    pub async fn find_target_topic_partitions(&self) -> Result<Vec<TopicPartition>> {
        let mut topics: Vec<String> = self
            .target_admin
            .list_topics()
            .await?
            .into_iter()
            .filter(|topic| !self.replication_policy.is_internal_topic(topic))
            .filter(|topic| self.replication_policy.upstream_topic(topic).is_some())
            .collect();
        topics.sort();
        self.describe_topic_partitions(self.target_admin.as_ref(), &topics)
            .await
    }

    async fn describe_topic_partitions(
        &self,
        admin: &dyn AdminClient,
        topics: &[String],
    ) -> Result<Vec<TopicPartition>> {
        if topics.is_empty() {
            return Ok(Vec::new());
        }
        Ok(admin
            .describe_topics(topics)
            .await?
            .iter()
            .flat_map(|description| description.topic_partitions())
            .collect())
    }

    async fn create_new_topics(
        &self,
        topics: &[String],
        partition_counts: &BTreeMap<String, u32>,
    ) -> Result<()> {
        let source_configs = self.describe_topic_configs(topics).await?;
        let new_topics: Vec<NewTopic> = topics
            .iter()
            .map(|topic| {
                let remote = self.format_remote_topic(topic);
                let partitions = partition_counts.get(topic).copied().unwrap_or(1);
                let configs = source_configs.get(topic).cloned().unwrap_or_default();
                NewTopic::new(remote, partitions, self.config.replication_factor)
                    .with_configs(self.target_config(&configs).to_map())
            })
            .collect();
        self.do_create_topics(new_topics).await;
        Ok(())
    }

    async fn do_create_topics(&self, topics: Vec<NewTopic>) {
        let partitions_by_name: HashMap<String, u32> = topics
            .iter()
            .map(|t| (t.name.clone(), t.partitions))
            .collect();
        for (name, outcome) in self.target_admin.create_topics(topics).await {
            match outcome {
                Ok(()) => info!(
                    "Created remote topic {} with {} partitions",
                    name,
                    partitions_by_name.get(&name).copied().unwrap_or_default()
                ),
                Err(AdminError::TopicExists(_)) => {
                    debug!("Remote topic {} already exists", name)
                }
                Err(e) => warn!("Could not create remote topic {}: {}", name, e),
            }
        }
    }

    async fn create_new_partitions(&self, partition_counts: HashMap<String, u32>) {
        let requested = partition_counts.clone();
        for (topic, outcome) in self.target_admin.create_partitions(partition_counts).await {
            match outcome {
                Ok(()) => info!(
                    "Increased size of {} to {} partitions",
                    topic,
                    requested.get(&topic).copied().unwrap_or_default()
                ),
                Err(AdminError::InvalidPartitions { .. }) => {
                    // normal when the target caught up between ticks
                    debug!("Partition count of {} is already current", topic)
                }
                Err(e) => warn!("Could not create partitions for {}: {}", topic, e),
            }
        }
    }

    /// Mirror eligible topic ACLs onto the target cluster.
    pub async fn sync_topic_acls(&self) -> Result<()> {
        let Some(bindings) = self.list_topic_acl_bindings().await? else {
            return Ok(());
        };
        let bindings: Vec<AclBinding> = bindings
            .into_iter()
            .filter(|b| b.pattern.resource_type == ResourceType::Topic)
            .filter(|b| b.pattern.pattern_type == PatternType::Literal)
            .filter(|b| self.should_replicate_acl(b))
            .filter(|b| self.should_replicate_topic(&b.pattern.name))
            .map(|b| self.target_acl_binding(b))
            .collect();
        self.update_topic_acls(bindings).await;
        Ok(())
    }

    /// Describe topic ACLs on the source, handling the authorizer-disabled
    /// degenerate case: warn once with the config recommendation, then only
    /// note the skip on later calls. `None` means "nothing to sync".
    async fn list_topic_acl_bindings(&self) -> Result<Option<Vec<AclBinding>>> {
        match self
            .source_admin
            .describe_acls(&AclBindingFilter::any_topic_allow())
            .await
        {
            Ok(bindings) => Ok(Some(bindings)),
            Err(AdminError::SecurityDisabled(_)) => {
                if self
                    .no_acl_authorizer
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    warn!(
                        "No ACL authorizer is configured on the source cluster, so no topic \
                         ACL syncing will take place. Consider disabling topic ACL syncing by \
                         setting {} to 'false'.",
                        SYNC_TOPIC_ACLS_ENABLED
                    );
                } else {
                    debug!("Source cluster has no ACL authorizer, skipping topic ACL sync");
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrite a source ACL binding for the target cluster: the resource
    /// name becomes the mirrored topic name, and `ALLOW ALL` is downgraded
    /// to `ALLOW READ` so only consumer-style access crosses the mirror.
    pub fn target_acl_binding(&self, binding: AclBinding) -> AclBinding {
        let remote = self.format_remote_topic(&binding.pattern.name);
        let entry = if binding.entry.permission == AclPermission::Allow
            && binding.entry.operation == AclOperation::All
        {
            AccessControlEntry {
                operation: AclOperation::Read,
                ..binding.entry
            }
        } else {
            binding.entry
        };
        AclBinding::new(
            ResourcePattern::new(ResourceType::Topic, remote, PatternType::Literal),
            entry,
        )
    }

    async fn update_topic_acls(&self, bindings: Vec<AclBinding>) {
        if bindings.is_empty() {
            return;
        }
        trace!("Syncing {} topic ACL bindings", bindings.len());
        for (name, outcome) in self.target_admin.create_acls(bindings).await {
            if let Err(e) = outcome {
                warn!("Could not sync ACL of topic {}: {}", name, e);
            }
        }
    }

    /// Propagate the explicitly-set configuration of replicated topics to
    /// their mirrored counterparts.
    pub async fn sync_topic_configs(&self) -> Result<()> {
        let topics = self.topics_being_replicated();
        if topics.is_empty() {
            return Ok(());
        }
        let source_configs = self.describe_topic_configs(&topics).await?;
        let target_configs: HashMap<String, TopicConfig> = source_configs
            .into_iter()
            .map(|(topic, config)| (self.format_remote_topic(&topic), self.target_config(&config)))
            .collect();
        for (topic, outcome) in self.target_admin.alter_topic_configs(target_configs).await {
            if let Err(e) = outcome {
                warn!("Could not alter configuration of topic {}: {}", topic, e);
            }
        }
        Ok(())
    }

    /// Project a source topic configuration onto what the target should
    /// carry: only properties explicitly set on the topic, minus the
    /// excluded ones.
    pub fn target_config(&self, config: &TopicConfig) -> TopicConfig {
        TopicConfig::new(
            config
                .entries
                .iter()
                .filter(|entry| entry.source.is_explicitly_set())
                .filter(|entry| {
                    self.config_property_filter
                        .should_replicate_config_property(&entry.name)
                })
                .cloned()
                .collect(),
        )
    }

    /// Source topics whose mirrored counterpart currently exists on the
    /// target. Only their configs are worth syncing.
    pub fn topics_being_replicated(&self) -> Vec<String> {
        let known_source = self.known_source_topic_partitions.read().clone();
        let target_topics: HashSet<String> = self
            .known_target_topic_partitions
            .read()
            .iter()
            .map(|tp| tp.topic.clone())
            .collect();
        let mut seen = HashSet::new();
        known_source
            .iter()
            .map(|tp| tp.topic.clone())
            .filter(|topic| seen.insert(topic.clone()))
            .filter(|topic| target_topics.contains(&self.format_remote_topic(topic)))
            .collect()
    }

    /// Describe topic configs on the source cluster
    pub async fn describe_topic_configs(
        &self,
        topics: &[String],
    ) -> Result<HashMap<String, TopicConfig>> {
        if topics.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self.source_admin.describe_topic_configs(topics).await?)
    }

    async fn create_offset_syncs_topic(&self) -> Result<()> {
        create_compacted_topic(
            self.source_admin.as_ref(),
            &self.config.offset_syncs_topic(),
            1,
            self.config.offset_syncs_topic_replication_factor,
        )
        .await;
        Ok(())
    }
}

/// Number of known partitions per topic
fn partition_counts(partitions: &[TopicPartition]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for tp in partitions {
        *counts.entry(tp.topic.clone()).or_insert(0) += 1;
    }
    counts
}
