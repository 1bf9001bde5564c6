//! Scenario tests for the consumer-group checkpoint connector: group
//! discovery and filtering, change-driven reconfiguration, task assignment,
//! and the disabled-emission degenerate cases.

mod common;

use std::sync::Arc;

use common::{tp, wait_for, MockAdmin, MockContext};
use mirrorlink_connect::config::TASK_CONSUMER_GROUPS;
use mirrorlink_connect::{MirrorCheckpointConfig, MirrorCheckpointConnector};

struct Fixture {
    source: Arc<MockAdmin>,
    target: Arc<MockAdmin>,
    context: Arc<MockContext>,
    connector: Arc<MirrorCheckpointConnector>,
}

fn fixture(config: MirrorCheckpointConfig) -> Fixture {
    let source = MockAdmin::new();
    let target = MockAdmin::new();
    let context = MockContext::new();
    let connector = Arc::new(
        MirrorCheckpointConnector::new(config, source.clone(), target.clone(), context.clone())
            .unwrap(),
    );
    Fixture {
        source,
        target,
        context,
        connector,
    }
}

fn default_fixture() -> Fixture {
    fixture(MirrorCheckpointConfig::new("source", "target"))
}

#[tokio::test]
async fn test_find_consumer_groups_filters() {
    let f = default_fixture();
    f.source
        .set_groups(vec!["billing", "analytics", "console-consumer-4711"]);
    // billing consumes a replicated topic
    f.source.set_group_offsets("billing", vec![(tp("orders", 0), 42)]);
    // analytics only holds offsets for topics the topic filter rejects
    f.source
        .set_group_offsets("analytics", vec![(tp("__consumer_offsets", 0), 7)]);
    // the console consumer would qualify by topic, but the group filter
    // rejects it before offsets are even inspected
    f.source
        .set_group_offsets("console-consumer-4711", vec![(tp("orders", 0), 1)]);

    let groups = f.connector.find_consumer_groups().await.unwrap();
    assert_eq!(groups, vec!["billing"]);
}

#[tokio::test]
async fn test_groups_without_offsets_are_irrelevant() {
    let f = default_fixture();
    f.source.set_groups(vec!["idle-group"]);

    let groups = f.connector.find_consumer_groups().await.unwrap();
    assert!(groups.is_empty());
}

#[tokio::test]
async fn test_refresh_requests_reconfiguration_only_on_change() {
    let f = default_fixture();
    f.source.set_groups(vec!["billing"]);
    f.source.set_group_offsets("billing", vec![(tp("orders", 0), 42)]);

    f.connector.refresh_consumer_groups().await.unwrap();
    assert_eq!(f.context.reconfiguration_count(), 1);
    assert_eq!(*f.connector.known_consumer_groups(), vec!["billing"]);

    // steady state: same groups, no reconfiguration
    f.connector.refresh_consumer_groups().await.unwrap();
    assert_eq!(f.context.reconfiguration_count(), 1);

    // a new group appears
    f.source.set_groups(vec!["billing", "fraud"]);
    f.source.set_group_offsets("fraud", vec![(tp("orders", 1), 10)]);
    f.connector.refresh_consumer_groups().await.unwrap();
    assert_eq!(f.context.reconfiguration_count(), 2);

    // a group vanishes
    f.source.set_groups(vec!["fraud"]);
    f.connector.refresh_consumer_groups().await.unwrap();
    assert_eq!(f.context.reconfiguration_count(), 3);
    assert_eq!(*f.connector.known_consumer_groups(), vec!["fraud"]);
}

#[tokio::test]
async fn test_load_initial_consumer_groups() {
    let f = default_fixture();
    f.source.set_groups(vec!["billing"]);
    f.source.set_group_offsets("billing", vec![(tp("orders", 0), 42)]);

    f.connector.load_initial_consumer_groups().await.unwrap();
    assert_eq!(*f.connector.known_consumer_groups(), vec!["billing"]);
    // the initial load hands the host its first non-empty assignment
    assert_eq!(f.context.reconfiguration_count(), 1);
}

#[test]
fn test_task_configs_round_robin_groups() {
    let f = default_fixture();
    f.connector.set_known_consumer_groups(
        ["g1", "g2", "g3", "g4", "g5"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );

    let output = f.connector.task_configs(2);
    assert_eq!(output.len(), 2);
    assert_eq!(
        output[0].get(TASK_CONSUMER_GROUPS).map(String::as_str),
        Some("g1,g3,g5")
    );
    assert_eq!(
        output[1].get(TASK_CONSUMER_GROUPS).map(String::as_str),
        Some("g2,g4")
    );
}

#[test]
fn test_task_configs_cap_at_group_count() {
    let f = default_fixture();
    f.connector
        .set_known_consumer_groups(vec!["g1".to_string(), "g2".to_string()]);
    assert_eq!(f.connector.task_configs(8).len(), 2);
}

#[test]
fn test_task_configs_empty_cases() {
    // no known groups
    let f = default_fixture();
    assert!(f.connector.task_configs(4).is_empty());

    // checkpoint emission disabled via negative interval
    let mut config = MirrorCheckpointConfig::new("source", "target");
    config.emit_checkpoints_interval_ms = -1;
    let f = fixture(config);
    f.connector
        .set_known_consumer_groups(vec!["g1".to_string()]);
    assert!(f.connector.task_configs(4).is_empty());

    // replication disabled entirely
    let mut config = MirrorCheckpointConfig::new("source", "target");
    config.enabled = false;
    let f = fixture(config);
    f.connector
        .set_known_consumer_groups(vec!["g1".to_string()]);
    assert!(f.connector.task_configs(4).is_empty());
}

#[tokio::test]
async fn test_lifecycle_creates_checkpoints_topic_and_loads_groups() {
    let f = default_fixture();
    f.source.set_groups(vec!["billing"]);
    f.source.set_group_offsets("billing", vec![(tp("orders", 0), 42)]);

    f.connector.start().unwrap();

    wait_for(
        || {
            f.target
                .created_topics()
                .iter()
                .any(|t| t.name == "source.checkpoints.internal" && t.partitions == 1)
        },
        "checkpoints topic creation",
    )
    .await;
    wait_for(
        || f.connector.known_consumer_groups().contains(&"billing".to_string()),
        "initial consumer-group discovery",
    )
    .await;

    f.connector.stop().await;
    assert_eq!(*f.connector.known_consumer_groups(), vec!["billing"]);
}
