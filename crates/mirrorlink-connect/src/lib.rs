//! mirrorlink-connect - control plane for cross-cluster topic replication
//!
//! Given a *source* and a *target* broker cluster, the connectors in this
//! crate continuously discover which topics, partitions, topic configs, and
//! ACLs should be mirrored, converge the target cluster, and partition the
//! replication work across a bounded pool of worker tasks.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  MirrorSourceConnector            MirrorCheckpointConnector    │
//! │  topics / partitions / configs    consumer groups              │
//! │  / ACLs                                                        │
//! ├────────────────────────────────────────────────────────────────┤
//! │  Scheduler (one serialized worker per connector)               │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ReplicationPolicy · TopicFilter / GroupFilter /               │
//! │  ConfigPropertyFilter · round-robin task assignment            │
//! ├────────────────────────────────────────────────────────────────┤
//! │  AdminClient (capability over the brokers' admin RPCs)         │
//! │  ConnectorContext (callback into the host runtime)             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connectors are stateless across restarts: everything they know is
//! re-derived from the brokers on the next discovery tick.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirrorlink_connect::{MirrorSourceConfig, MirrorSourceConnector};
//!
//! let config = MirrorSourceConfig::new("us-west", "us-east");
//! let connector = Arc::new(MirrorSourceConnector::new(
//!     config, source_admin, target_admin, context,
//! )?);
//! connector.start()?;
//! // ... host runtime calls connector.task_configs(max_tasks) ...
//! connector.stop().await;
//! ```

// Value types and capabilities
pub mod admin;
pub mod error;
pub mod types;

// Policy and filtering
pub mod filters;
pub mod policy;

// Runtime modules
pub mod assignment;
pub mod checkpoint_connector;
pub mod config;
pub mod scheduler;
pub mod source_connector;
pub mod telemetry;

// Re-export the capability traits
pub use admin::{AdminClient, ConnectorContext};

// Re-export error types
pub use error::{AdminError, AdminResult, ConnectError, Result};

// Re-export config types
pub use config::{MirrorCheckpointConfig, MirrorSourceConfig, PolicyKind, ReplicationPolicyConfig};

// Re-export policy and filters
pub use filters::{ConfigPropertyFilter, GroupFilter, TopicFilter};
pub use policy::{CustomPolicy, ReplicationPolicy};

// Re-export the connectors and scheduler
pub use checkpoint_connector::MirrorCheckpointConnector;
pub use scheduler::Scheduler;
pub use source_connector::MirrorSourceConnector;

// Re-export the common value types
pub use types::{
    AccessControlEntry, AclBinding, AclBindingFilter, AclOperation, AclPermission, ConfigEntry,
    ConfigSource, NewTopic, PatternType, ResourcePattern, ResourceType, SourceAndTarget,
    TopicConfig, TopicDescription, TopicPartition,
};

// Re-export commonly used dependencies for host implementations
pub use async_trait::async_trait;
