//! Error types for mirrorlink-connect
//!
//! Two error surfaces: `ConnectError` for the connector runtime and
//! `AdminError` for the admin-client capability. Admin errors are a sum type
//! so callers can switch on the kind instead of downcasting causes.

use thiserror::Error;

/// Result type alias for connector runtime operations
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Result type alias for admin-client operations
pub type AdminResult<T> = std::result::Result<T, AdminError>;

/// Main error type for the connector runtime
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Configuration error (fatal at start)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Admin client error surfaced by a reconciliation job
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// Work was submitted to a closed scheduler
    #[error("Scheduler is closed")]
    SchedulerClosed,

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConnectError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is retryable on the next scheduler tick
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Admin(e) => e.is_retryable(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Errors returned by an [`AdminClient`](crate::admin::AdminClient)
///
/// The variants are the error taxonomy the connector switches on: transient
/// kinds are retried on the next tick, `SecurityDisabled` is handled
/// specially by the ACL sync, and the existence conflicts are benign.
#[derive(Debug, Clone, Error)]
pub enum AdminError {
    /// The broker has no authorizer configured; ACL operations cannot work
    #[error("security disabled: {0}")]
    SecurityDisabled(String),

    /// Transient broker error; safe to retry
    #[error("transient broker error: {0}")]
    Transient(String),

    /// The request did not complete within the admin timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Create-topic conflict: the topic already exists
    #[error("topic already exists: {0}")]
    TopicExists(String),

    /// Create-partitions conflict: the partition count is already current
    #[error("invalid partition count for {topic}: {message}")]
    InvalidPartitions { topic: String, message: String },

    /// Unrecoverable broker or protocol error
    #[error("fatal admin error: {0}")]
    Fatal(String),
}

impl AdminError {
    /// Create a security-disabled error
    pub fn security_disabled(msg: impl Into<String>) -> Self {
        Self::SecurityDisabled(msg.into())
    }

    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a topic-exists conflict
    pub fn topic_exists(topic: impl Into<String>) -> Self {
        Self::TopicExists(topic.into())
    }

    /// Create an invalid-partitions conflict
    pub fn invalid_partitions(topic: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidPartitions {
            topic: topic.into(),
            message: msg.into(),
        }
    }

    /// Create a fatal error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Check if this error is an existence conflict that create operations
    /// log at debug and swallow
    pub fn is_benign_conflict(&self) -> bool {
        matches!(self, Self::TopicExists(_) | Self::InvalidPartitions { .. })
    }
}
