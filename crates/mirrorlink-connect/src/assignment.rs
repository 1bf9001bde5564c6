//! Deterministic task assignment
//!
//! Replication units (topic-partitions for the source connector, consumer
//! groups for the checkpoint connector) are dealt round-robin into
//! `min(max_tasks, units)` buckets by stable input order: unit `i` lands in
//! bucket `i % num_tasks`. Assignments serialize as comma-separated tokens,
//! `topic-partition` with a dash for partitions.

use crate::error::Result;
use crate::types::TopicPartition;

/// Deal `units` round-robin into at most `max_tasks` buckets
///
/// Returns `min(max_tasks, units.len())` non-empty buckets preserving the
/// input order within each bucket; empty when there is nothing to assign.
pub fn round_robin_group<T: Clone>(units: &[T], max_tasks: usize) -> Vec<Vec<T>> {
    if units.is_empty() || max_tasks == 0 {
        return Vec::new();
    }
    let num_tasks = max_tasks.min(units.len());
    let mut buckets: Vec<Vec<T>> = vec![Vec::new(); num_tasks];
    for (i, unit) in units.iter().enumerate() {
        buckets[i % num_tasks].push(unit.clone());
    }
    buckets
}

/// Serialize an assignment of topic-partitions as `topic-partition` CSV
pub fn encode_topic_partitions(partitions: &[TopicPartition]) -> String {
    partitions
        .iter()
        .map(TopicPartition::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a `topic-partition` CSV back into topic-partitions
pub fn decode_topic_partitions(encoded: &str) -> Result<Vec<TopicPartition>> {
    encoded
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Serialize an assignment of consumer-group ids as CSV
pub fn encode_consumer_groups(groups: &[String]) -> String {
    groups.join(",")
}

/// Parse a consumer-group CSV back into group ids
pub fn decode_consumer_groups(encoded: &str) -> Vec<String> {
    encoded
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(topic: &str, partition: u32) -> TopicPartition {
        TopicPartition::new(topic, partition)
    }

    #[test]
    fn test_round_robin_three_tasks() {
        let units = vec![
            tp("t0", 0),
            tp("t0", 1),
            tp("t0", 2),
            tp("t0", 3),
            tp("t0", 4),
            tp("t0", 5),
            tp("t0", 6),
            tp("t0", 7),
            tp("t1", 0),
            tp("t1", 1),
            tp("t2", 0),
            tp("t2", 1),
        ];
        let buckets = round_robin_group(&units, 3);
        assert_eq!(buckets.len(), 3);
        assert_eq!(encode_topic_partitions(&buckets[0]), "t0-0,t0-3,t0-6,t1-1");
        assert_eq!(encode_topic_partitions(&buckets[1]), "t0-1,t0-4,t0-7,t2-0");
        assert_eq!(encode_topic_partitions(&buckets[2]), "t0-2,t0-5,t1-0,t2-1");
    }

    #[test]
    fn test_fewer_units_than_tasks() {
        let units = vec![tp("t0", 0), tp("t0", 1)];
        let buckets = round_robin_group(&units, 5);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0], vec![tp("t0", 0)]);
        assert_eq!(buckets[1], vec![tp("t0", 1)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(round_robin_group::<TopicPartition>(&[], 4).is_empty());
        let units = vec![tp("t0", 0)];
        assert!(round_robin_group(&units, 0).is_empty());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let units = vec![tp("us-west.orders", 3), tp("t1", 0)];
        let encoded = encode_topic_partitions(&units);
        assert_eq!(encoded, "us-west.orders-3,t1-0");
        assert_eq!(decode_topic_partitions(&encoded).unwrap(), units);
        assert!(decode_topic_partitions("").unwrap().is_empty());
        assert!(decode_topic_partitions("nodash").is_err());
    }

    #[test]
    fn test_group_assignment() {
        let groups: Vec<String> = ["g1", "g2", "g3"].iter().map(|s| s.to_string()).collect();
        let buckets = round_robin_group(&groups, 2);
        assert_eq!(encode_consumer_groups(&buckets[0]), "g1,g3");
        assert_eq!(encode_consumer_groups(&buckets[1]), "g2");
        assert_eq!(decode_consumer_groups("g1,g3"), vec!["g1", "g3"]);
    }
}
