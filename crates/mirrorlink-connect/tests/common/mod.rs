//! Shared test doubles: a recording in-memory admin client and a counting
//! connector context.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mirrorlink_connect::{
    AclBinding, AclBindingFilter, AdminClient, AdminError, AdminResult, ConnectorContext,
    NewTopic, TopicConfig, TopicDescription, TopicPartition,
};

/// In-memory admin client that records every mutating call
#[derive(Default)]
pub struct MockAdmin {
    topics: Mutex<Vec<TopicDescription>>,
    configs: Mutex<HashMap<String, TopicConfig>>,
    acls: Mutex<Vec<AclBinding>>,
    groups: Mutex<Vec<String>>,
    group_offsets: Mutex<HashMap<String, HashMap<TopicPartition, u64>>>,
    security_disabled: AtomicBool,

    pub create_topics_calls: Mutex<Vec<Vec<NewTopic>>>,
    pub create_partitions_calls: Mutex<Vec<HashMap<String, u32>>>,
    pub create_acls_calls: Mutex<Vec<Vec<AclBinding>>>,
    pub alter_configs_calls: Mutex<Vec<HashMap<String, TopicConfig>>>,
    pub describe_configs_calls: AtomicUsize,
    pub interactions: AtomicUsize,
}

impl MockAdmin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the visible topics
    pub fn set_topics(&self, topics: Vec<TopicDescription>) {
        *self.topics.lock() = topics;
    }

    /// Set the config reported for one topic
    pub fn set_topic_config(&self, topic: &str, config: TopicConfig) {
        self.configs.lock().insert(topic.to_string(), config);
    }

    pub fn set_acls(&self, acls: Vec<AclBinding>) {
        *self.acls.lock() = acls;
    }

    pub fn set_groups(&self, groups: Vec<&str>) {
        *self.groups.lock() = groups.into_iter().map(str::to_string).collect();
    }

    pub fn set_group_offsets(&self, group: &str, offsets: Vec<(TopicPartition, u64)>) {
        self.group_offsets
            .lock()
            .insert(group.to_string(), offsets.into_iter().collect());
    }

    /// Make `describe_acls` fail as if the cluster had no authorizer
    pub fn disable_security(&self) {
        self.security_disabled.store(true, Ordering::SeqCst);
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.load(Ordering::SeqCst)
    }

    pub fn create_topics_call_count(&self) -> usize {
        self.create_topics_calls.lock().len()
    }

    pub fn created_topics(&self) -> Vec<NewTopic> {
        self.create_topics_calls.lock().iter().flatten().cloned().collect()
    }

    fn touch(&self) {
        self.interactions.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AdminClient for MockAdmin {
    async fn list_topics(&self) -> AdminResult<Vec<String>> {
        self.touch();
        Ok(self.topics.lock().iter().map(|t| t.name.clone()).collect())
    }

    async fn describe_topics(&self, topics: &[String]) -> AdminResult<Vec<TopicDescription>> {
        self.touch();
        Ok(self
            .topics
            .lock()
            .iter()
            .filter(|t| topics.contains(&t.name))
            .cloned()
            .collect())
    }

    async fn describe_topic_configs(
        &self,
        topics: &[String],
    ) -> AdminResult<HashMap<String, TopicConfig>> {
        self.touch();
        self.describe_configs_calls.fetch_add(1, Ordering::SeqCst);
        let configs = self.configs.lock();
        Ok(topics
            .iter()
            .filter_map(|t| configs.get(t).map(|c| (t.clone(), c.clone())))
            .collect())
    }

    async fn describe_acls(&self, filter: &AclBindingFilter) -> AdminResult<Vec<AclBinding>> {
        self.touch();
        if self.security_disabled.load(Ordering::SeqCst) {
            return Err(AdminError::security_disabled(
                "no ACL authorizer configured on this broker",
            ));
        }
        Ok(self
            .acls
            .lock()
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn create_topics(&self, topics: Vec<NewTopic>) -> Vec<(String, AdminResult<()>)> {
        self.touch();
        let names: Vec<String> = topics.iter().map(|t| t.name.clone()).collect();
        self.create_topics_calls.lock().push(topics);
        names.into_iter().map(|n| (n, Ok(()))).collect()
    }

    async fn create_partitions(
        &self,
        partition_counts: HashMap<String, u32>,
    ) -> Vec<(String, AdminResult<()>)> {
        self.touch();
        let names: Vec<String> = partition_counts.keys().cloned().collect();
        self.create_partitions_calls.lock().push(partition_counts);
        names.into_iter().map(|n| (n, Ok(()))).collect()
    }

    async fn create_acls(&self, bindings: Vec<AclBinding>) -> Vec<(String, AdminResult<()>)> {
        self.touch();
        let names: Vec<String> = bindings.iter().map(|b| b.pattern.name.clone()).collect();
        self.create_acls_calls.lock().push(bindings);
        names.into_iter().map(|n| (n, Ok(()))).collect()
    }

    async fn alter_topic_configs(
        &self,
        configs: HashMap<String, TopicConfig>,
    ) -> Vec<(String, AdminResult<()>)> {
        self.touch();
        let names: Vec<String> = configs.keys().cloned().collect();
        self.alter_configs_calls.lock().push(configs);
        names.into_iter().map(|n| (n, Ok(()))).collect()
    }

    async fn list_consumer_groups(&self) -> AdminResult<Vec<String>> {
        self.touch();
        Ok(self.groups.lock().clone())
    }

    async fn list_consumer_group_offsets(
        &self,
        group: &str,
    ) -> AdminResult<HashMap<TopicPartition, u64>> {
        self.touch();
        Ok(self
            .group_offsets
            .lock()
            .get(group)
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&self) {
        self.touch();
    }
}

/// Connector context that counts reconfiguration requests
#[derive(Default)]
pub struct MockContext {
    reconfigurations: AtomicUsize,
}

impl MockContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reconfiguration_count(&self) -> usize {
        self.reconfigurations.load(Ordering::SeqCst)
    }
}

impl ConnectorContext for MockContext {
    fn request_task_reconfiguration(&self) {
        self.reconfigurations.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn tp(topic: &str, partition: u32) -> TopicPartition {
    TopicPartition::new(topic, partition)
}

/// Poll `check` until it holds or the deadline passes
pub async fn wait_for(check: impl Fn() -> bool, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}
