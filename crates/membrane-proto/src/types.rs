//! Core types for the membrane protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ProtoError;

/// Correlation identifier tying a server request to its client response.
///
/// The server matches responses to pending requests by this id; clients
/// must echo it verbatim and never mint a fresh one for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Create a new random `CorrelationId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a `CorrelationId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ProtoError::Validation(format!("invalid correlation id: {e}")))
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of resources a client can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// HTTP API.
    Api,
    /// Blob bucket.
    Bucket,
    /// Pub/sub topic.
    Topic,
    /// Message queue.
    Queue,
    /// Secret store entry.
    Secret,
    /// Cron or interval schedule.
    Schedule,
    /// Websocket endpoint.
    Websocket,
    /// Batch job definition.
    BatchJob,
    /// Access policy.
    Policy,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Api => "api",
            Self::Bucket => "bucket",
            Self::Topic => "topic",
            Self::Queue => "queue",
            Self::Secret => "secret",
            Self::Schedule => "schedule",
            Self::Websocket => "websocket",
            Self::BatchJob => "batch_job",
            Self::Policy => "policy",
        };
        write!(f, "{s}")
    }
}

/// Identifies one declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// Resource name, unique per kind within an application.
    pub name: String,
}

impl ResourceIdentifier {
    /// Create a new resource identifier.
    #[must_use]
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.name)
    }
}

/// Actions a policy can grant on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read a file from a bucket.
    BucketFileGet,
    /// Write a file to a bucket.
    BucketFilePut,
    /// Delete a file from a bucket.
    BucketFileDelete,
    /// List files in a bucket.
    BucketFileList,
    /// Publish to a topic.
    TopicPublish,
    /// Enqueue onto a queue.
    QueueEnqueue,
    /// Dequeue from a queue.
    QueueDequeue,
    /// Read a secret value.
    SecretAccess,
    /// Write a secret value.
    SecretPut,
    /// Manage websocket connections (send, close).
    WebsocketManage,
}

/// Bucket event kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketEventType {
    /// A file was created or overwritten.
    Created,
    /// A file was deleted.
    Deleted,
}

impl fmt::Display for BucketEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// Websocket event kinds a handler can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebsocketEventType {
    /// A client opened a connection.
    Connect,
    /// A client closed its connection.
    Disconnect,
    /// A client sent a message.
    Message,
}

impl fmt::Display for WebsocketEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Message => "message",
        };
        write!(f, "{s}")
    }
}

/// When a schedule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Fixed interval in seconds.
    Rate {
        /// Seconds between ticks.
        interval_secs: u64,
    },
    /// Cron expression evaluated by the server.
    Cron {
        /// Cron expression.
        expression: String,
    },
}
