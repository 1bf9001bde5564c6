//! Checkpoint connector: consumer-group discovery for offset replication
//!
//! The companion of the topic-replication connector. It discovers which
//! consumer groups on the source cluster are worth checkpointing: groups
//! the group filter accepts that hold offsets for at least one replicated
//! topic. It then partitions them across the checkpoint worker tasks.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::admin::{create_compacted_topic, AdminClient, ConnectorContext};
use crate::assignment::round_robin_group;
use crate::config::MirrorCheckpointConfig;
use crate::error::Result;
use crate::filters::{GroupFilter, TopicFilter};
use crate::policy::ReplicationPolicy;
use crate::scheduler::Scheduler;
use crate::types::SourceAndTarget;

/// Control plane of one source→target consumer-group checkpoint flow
pub struct MirrorCheckpointConnector {
    name: String,
    config: MirrorCheckpointConfig,
    source_and_target: SourceAndTarget,
    #[allow(dead_code)]
    replication_policy: ReplicationPolicy,
    topic_filter: TopicFilter,
    group_filter: GroupFilter,
    source_admin: Arc<dyn AdminClient>,
    target_admin: Arc<dyn AdminClient>,
    context: Arc<dyn ConnectorContext>,
    known_consumer_groups: RwLock<Arc<Vec<String>>>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl MirrorCheckpointConnector {
    /// Build the connector from its config, deriving policy and filters.
    pub fn new(
        config: MirrorCheckpointConfig,
        source_admin: Arc<dyn AdminClient>,
        target_admin: Arc<dyn AdminClient>,
        context: Arc<dyn ConnectorContext>,
    ) -> Result<Self> {
        config.validate_config()?;
        let replication_policy = config.replication_policy();
        let topic_filter = config.topic_filter()?;
        let group_filter = config.group_filter()?;
        Ok(Self::from_parts(
            config,
            replication_policy,
            topic_filter,
            group_filter,
            source_admin,
            target_admin,
            context,
        ))
    }

    /// Assemble the connector from pre-built parts.
    pub fn from_parts(
        config: MirrorCheckpointConfig,
        replication_policy: ReplicationPolicy,
        topic_filter: TopicFilter,
        group_filter: GroupFilter,
        source_admin: Arc<dyn AdminClient>,
        target_admin: Arc<dyn AdminClient>,
        context: Arc<dyn ConnectorContext>,
    ) -> Self {
        let source_and_target = config.source_and_target();
        Self {
            name: format!("MirrorCheckpointConnector({source_and_target})"),
            config,
            source_and_target,
            replication_policy,
            topic_filter,
            group_filter,
            source_admin,
            target_admin,
            context,
            known_consumer_groups: RwLock::new(Arc::new(Vec::new())),
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
                async move { connector.create_checkpoints_topic().await }
            },
            "creating checkpoints topic",
        );

        let connector = Arc::clone(self);
        scheduler.execute(
            move || {
                let connector = Arc::clone(&connector);
                async move { connector.load_initial_consumer_groups().await }
            },
            "loading initial consumer groups",
        );

        let connector = Arc::clone(self);
        scheduler.schedule_repeating_delayed(
            move || {
                let connector = Arc::clone(&connector);
                async move { connector.refresh_consumer_groups().await }
            },
            self.config.refresh_groups_interval(),
            "refreshing consumer groups",
        );

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
            "Stopped {} with {} consumer groups",
            self.name,
            self.known_consumer_groups.read().len()
        );
    }

    /// Distribute the known consumer groups over at most `max_tasks` task
    /// configurations. Empty when checkpoint emission is disabled via a
    /// negative interval.
    pub fn task_configs(&self, max_tasks: usize) -> Vec<HashMap<String, String>> {
        let known = self.known_consumer_groups.read().clone();
        if !self.config.enabled || known.is_empty() || self.config.emit_checkpoints_disabled() {
            return Vec::new();
        }
        round_robin_group(&known, max_tasks)
            .iter()
            .map(|groups| self.config.task_config(groups))
            .collect()
    }

    /// Snapshot of the consumer groups found by the last tick
    pub fn known_consumer_groups(&self) -> Arc<Vec<String>> {
        self.known_consumer_groups.read().clone()
    }

    /// Seed the discovery state without running a tick (testing)
    pub fn set_known_consumer_groups(&self, groups: Vec<String>) {
        *self.known_consumer_groups.write() = Arc::new(groups);
    }

    /// First discovery after start. Publishes the initial group set and,
    /// when it is non-empty, asks the host for task configs right away
    /// rather than waiting a full refresh interval.
    pub async fn load_initial_consumer_groups(&self) -> Result<()> {
        let groups = self.find_consumer_groups().await?;
        let initial_count = groups.len();
        *self.known_consumer_groups.write() = Arc::new(groups);
        info!("{} found {} consumer groups", self.name, initial_count);
        if initial_count > 0 {
            self.context.request_task_reconfiguration();
        }
        Ok(())
    }

    /// One discovery tick: list groups, diff against the known set, and
    /// request task reconfiguration when groups appeared or vanished.
    pub async fn refresh_consumer_groups(&self) -> Result<()> {
        let consumer_groups = self.find_consumer_groups().await?;
        let found: HashSet<&String> = consumer_groups.iter().collect();
        let known = self.known_consumer_groups.read().clone();
        let known_set: HashSet<&String> = known.iter().collect();

        let new_count = found.difference(&known_set).count();
        let dead_count = known_set.difference(&found).count();
        if new_count == 0 && dead_count == 0 {
            return Ok(());
        }

        info!(
            "Found {} consumer groups for {}. {} are new. {} were removed. Previously had {}.",
            consumer_groups.len(),
            self.source_and_target,
            new_count,
            dead_count,
            known.len(),
        );
        debug!(
            "Found new consumer groups: {:?}",
            found.difference(&known_set).collect::<Vec<_>>()
        );
        *self.known_consumer_groups.write() = Arc::new(consumer_groups);
        self.context.request_task_reconfiguration();
        Ok(())
    }

    /// Consumer groups worth checkpointing: accepted by the group filter
    /// and holding offsets for at least one topic the topic filter accepts.
    pub async fn find_consumer_groups(&self) -> Result<Vec<String>> {
        let filtered_groups: Vec<String> = self
            .source_admin
            .list_consumer_groups()
            .await?
            .into_iter()
            .filter(|group| self.group_filter.should_replicate_group(group))
            .collect();

        let mut checkpoint_groups = Vec::new();
        let mut irrelevant_groups = Vec::new();
        for group in filtered_groups {
            let consumed_topics = self
                .source_admin
                .list_consumer_group_offsets(&group)
                .await?
                .into_keys()
                .filter(|tp| self.topic_filter.should_replicate_topic(&tp.topic))
                .count();
            // only checkpoint groups with offsets for at least one topic
            // that is accepted by the topic filter
            if consumed_topics > 0 {
                checkpoint_groups.push(group);
            } else {
                irrelevant_groups.push(group);
            }
        }

        debug!(
            "Ignoring groups with no offsets for topics accepted by the topic filter: {:?}",
            irrelevant_groups
        );
        Ok(checkpoint_groups)
    }

    async fn create_checkpoints_topic(&self) -> Result<()> {
        create_compacted_topic(
            self.target_admin.as_ref(),
            &self.config.checkpoints_topic(),
            1,
            self.config.checkpoints_topic_replication_factor,
        )
        .await;
        Ok(())
    }
}
