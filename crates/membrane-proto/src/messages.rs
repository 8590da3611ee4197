//! Protocol message definitions.
//!
//! Every worker stream carries [`ClientMessage`] frames outbound and
//! [`ServerMessage`] frames inbound, each tagged with a [`CorrelationId`].
//! The first client frame on a stream is always a registration; everything
//! after that is a request/response exchange correlated by id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    Action, BucketEventType, CorrelationId, ResourceIdentifier, ResourceType, SchedulePolicy,
    WebsocketEventType,
};

/// Messages sent from the client to the membrane server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    /// Correlation id. For responses this echoes the originating request id.
    pub id: CorrelationId,
    /// Message payload.
    pub content: ClientContent,
}

/// Payload of a [`ClientMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientContent {
    /// Worker registration, sent once as the first frame on a stream.
    Registration {
        /// What kind of work this worker wants to receive.
        registration: RegistrationRequest,
    },
    /// Resource declaration, sent on the control channel.
    Declaration {
        /// The resource being declared.
        declaration: ResourceDeclaration,
    },
    /// Response to an HTTP request.
    HttpResponse {
        /// The response.
        response: HttpResponse,
    },
    /// Response to a topic message delivery.
    TopicResponse {
        /// The response.
        response: TopicResponse,
    },
    /// Response to a schedule tick.
    ScheduleResponse {
        /// The response.
        response: ScheduleResponse,
    },
    /// Response to a bucket event.
    BucketEventResponse {
        /// The response.
        response: BucketEventResponse,
    },
    /// Response to a websocket event.
    WebsocketEventResponse {
        /// The response.
        response: WebsocketEventResponse,
    },
    /// Response to a batch job request.
    JobResponse {
        /// The response.
        response: JobResponse,
    },
}

/// Messages sent from the membrane server to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    /// Correlation id, echoed back on the matching client response.
    pub id: CorrelationId,
    /// Message payload.
    pub content: ServerContent,
}

/// Payload of a [`ServerMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerContent {
    /// Acknowledges a worker registration. Carries no work.
    RegistrationAck {
        /// The (empty) ack payload.
        ack: RegistrationResponse,
    },
    /// Acknowledges a resource declaration.
    DeclarationAck {
        /// The ack payload.
        ack: DeclarationAck,
    },
    /// An inbound HTTP request for an API route worker.
    HttpRequest {
        /// The request.
        request: HttpRequest,
    },
    /// A message delivered to a topic subscription worker.
    TopicMessage {
        /// The message.
        message: TopicMessage,
    },
    /// A schedule firing for a schedule worker.
    ScheduleTick {
        /// The tick.
        tick: ScheduleTick,
    },
    /// A blob event for a bucket listener worker.
    BucketEvent {
        /// The event.
        event: BucketEvent,
    },
    /// A websocket lifecycle or message event.
    WebsocketEvent {
        /// The event.
        event: WebsocketEvent,
    },
    /// A batch job invocation for a job worker.
    JobRequest {
        /// The request.
        request: JobRequest,
    },
}

impl ServerContent {
    /// Short name of this payload variant, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RegistrationAck { .. } => "registration_ack",
            Self::DeclarationAck { .. } => "declaration_ack",
            Self::HttpRequest { .. } => "http_request",
            Self::TopicMessage { .. } => "topic_message",
            Self::ScheduleTick { .. } => "schedule_tick",
            Self::BucketEvent { .. } => "bucket_event",
            Self::WebsocketEvent { .. } => "websocket_event",
            Self::JobRequest { .. } => "job_request",
        }
    }
}

/// Worker registration descriptors, one per worker kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "worker", rename_all = "snake_case")]
pub enum RegistrationRequest {
    /// Serve one HTTP route of an API.
    ApiRoute {
        /// API name.
        api: String,
        /// Route path, e.g. `/orders/:id`.
        path: String,
        /// HTTP methods served by this worker.
        methods: Vec<String>,
    },
    /// Receive messages published to a topic.
    Subscription {
        /// Topic name.
        topic: String,
    },
    /// Receive ticks for a schedule.
    Schedule {
        /// Schedule name.
        schedule: String,
        /// When the schedule fires.
        policy: SchedulePolicy,
    },
    /// Receive blob events from a bucket.
    BucketListener {
        /// Bucket name.
        bucket: String,
        /// Which event kind to receive.
        event_type: BucketEventType,
    },
    /// Receive websocket events for a socket.
    Websocket {
        /// Socket name.
        socket: String,
        /// Which event kind to receive.
        event_type: WebsocketEventType,
    },
    /// Receive batch job invocations.
    Job {
        /// Job name.
        job: String,
    },
}

/// Registration acknowledgment payload.
///
/// Deliberately empty: the dispatch loop only cares that the ack arrived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationResponse {}

/// Resource declaration payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "resource", rename_all = "snake_case")]
pub enum ResourceDeclaration {
    /// Declare an HTTP API.
    Api {
        /// API name.
        name: String,
    },
    /// Declare a blob bucket.
    Bucket {
        /// Bucket name.
        name: String,
    },
    /// Declare a pub/sub topic.
    Topic {
        /// Topic name.
        name: String,
    },
    /// Declare a message queue.
    Queue {
        /// Queue name.
        name: String,
    },
    /// Declare a secret store entry.
    Secret {
        /// Secret name.
        name: String,
    },
    /// Declare a schedule.
    Schedule {
        /// Schedule name.
        name: String,
    },
    /// Declare a websocket endpoint.
    Websocket {
        /// Socket name.
        name: String,
    },
    /// Declare a batch job definition.
    BatchJob {
        /// Job name.
        name: String,
    },
    /// Grant the calling process actions on resources.
    Policy {
        /// Granted actions.
        actions: Vec<Action>,
        /// Resources the actions apply to.
        resources: Vec<ResourceIdentifier>,
    },
}

impl ResourceDeclaration {
    /// The identifier this declaration registers.
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        match self {
            Self::Api { name } => ResourceIdentifier::new(ResourceType::Api, name.clone()),
            Self::Bucket { name } => ResourceIdentifier::new(ResourceType::Bucket, name.clone()),
            Self::Topic { name } => ResourceIdentifier::new(ResourceType::Topic, name.clone()),
            Self::Queue { name } => ResourceIdentifier::new(ResourceType::Queue, name.clone()),
            Self::Secret { name } => ResourceIdentifier::new(ResourceType::Secret, name.clone()),
            Self::Schedule { name } => {
                ResourceIdentifier::new(ResourceType::Schedule, name.clone())
            }
            Self::Websocket { name } => {
                ResourceIdentifier::new(ResourceType::Websocket, name.clone())
            }
            Self::BatchJob { name } => {
                ResourceIdentifier::new(ResourceType::BatchJob, name.clone())
            }
            Self::Policy { resources, .. } => {
                let name = resources
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("+");
                ResourceIdentifier::new(ResourceType::Policy, name)
            }
        }
    }
}

/// Declaration acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeclarationAck {
    /// The identifier assigned to the declared resource.
    pub identifier: ResourceIdentifier,
}

/// An inbound HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Request path as matched, e.g. `/orders/42`.
    pub path: String,
    /// Header values by name.
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
    /// Query parameter values by name.
    #[serde(default)]
    pub query_params: HashMap<String, Vec<String>>,
    /// Path parameter values by name, e.g. `id -> 42`.
    #[serde(default)]
    pub path_params: HashMap<String, String>,
    /// Raw request body.
    #[serde(default)]
    pub body: Vec<u8>,
}

/// An outbound HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Header values by name.
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
    /// Raw response body.
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }
}

/// A message delivered to a topic subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Structured message payload.
    pub payload: Value,
}

/// Outcome of a topic message delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicResponse {
    /// Whether the handler processed the message.
    pub success: bool,
}

/// A schedule firing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleTick {
    /// Schedule that fired.
    pub schedule: String,
}

/// Outcome of a schedule tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleResponse {
    /// Whether the handler completed.
    pub success: bool,
}

/// A blob event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketEvent {
    /// Bucket the event occurred in.
    pub bucket: String,
    /// Key of the affected file.
    pub key: String,
    /// What happened to the file.
    pub event_type: BucketEventType,
}

/// Outcome of a bucket event delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketEventResponse {
    /// Whether the handler processed the event.
    pub success: bool,
}

/// A websocket lifecycle or message event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebsocketEvent {
    /// Socket the event occurred on.
    pub socket: String,
    /// Server-assigned connection id.
    pub connection_id: String,
    /// What happened.
    pub event_type: WebsocketEventType,
    /// Query parameters, present on connect events.
    #[serde(default)]
    pub query_params: HashMap<String, Vec<String>>,
    /// Message body, present on message events.
    #[serde(default)]
    pub body: Vec<u8>,
}

/// Outcome of a websocket event delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebsocketEventResponse {
    /// Whether the handler processed the event.
    pub success: bool,
    /// For connect events, whether the connection should be refused.
    #[serde(default)]
    pub reject: bool,
}

/// A batch job invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRequest {
    /// Job being invoked.
    pub job: String,
    /// Structured job input.
    pub data: Value,
}

/// Outcome of a batch job invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResponse {
    /// Whether the job handler completed.
    pub success: bool,
}

impl ClientMessage {
    /// Create a registration message with a fresh correlation id.
    #[must_use]
    pub fn registration(registration: RegistrationRequest) -> Self {
        Self {
            id: CorrelationId::new(),
            content: ClientContent::Registration { registration },
        }
    }

    /// Create a declaration message with a fresh correlation id.
    #[must_use]
    pub fn declaration(declaration: ResourceDeclaration) -> Self {
        Self {
            id: CorrelationId::new(),
            content: ClientContent::Declaration { declaration },
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, crate::ProtoError> {
        serde_json::to_string(self).map_err(|e| crate::ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, crate::ProtoError> {
        serde_json::from_str(json).map_err(|e| crate::ProtoError::Decoding(e.to_string()))
    }
}

impl ServerMessage {
    /// Create a registration ack echoing the given correlation id.
    #[must_use]
    pub fn registration_ack(id: CorrelationId) -> Self {
        Self {
            id,
            content: ServerContent::RegistrationAck {
                ack: RegistrationResponse::default(),
            },
        }
    }

    /// Create a declaration ack echoing the given correlation id.
    #[must_use]
    pub const fn declaration_ack(id: CorrelationId, identifier: ResourceIdentifier) -> Self {
        Self {
            id,
            content: ServerContent::DeclarationAck {
                ack: DeclarationAck { identifier },
            },
        }
    }

    /// Whether this message is a registration ack carrying no work.
    #[must_use]
    pub const fn is_registration_ack(&self) -> bool {
        matches!(self.content, ServerContent::RegistrationAck { .. })
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, crate::ProtoError> {
        serde_json::to_string(self).map_err(|e| crate::ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, crate::ProtoError> {
        serde_json::from_str(json).map_err(|e| crate::ProtoError::Decoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_message() {
        let msg = ClientMessage::registration(RegistrationRequest::Subscription {
            topic: "orders".to_string(),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("registration"));
        assert!(json.contains("subscription"));
        assert!(json.contains("orders"));
    }

    #[test]
    fn test_registration_ack_detection() {
        let ack = ServerMessage::registration_ack(CorrelationId::new());
        assert!(ack.is_registration_ack());

        let tick = ServerMessage {
            id: CorrelationId::new(),
            content: ServerContent::ScheduleTick {
                tick: ScheduleTick {
                    schedule: "nightly".to_string(),
                },
            },
        };
        assert!(!tick.is_registration_ack());
    }

    #[test]
    fn test_correlation_id_survives_roundtrip() {
        let id = CorrelationId::new();
        let msg = ServerMessage {
            id,
            content: ServerContent::HttpRequest {
                request: HttpRequest {
                    method: "GET".to_string(),
                    path: "/orders/42".to_string(),
                    headers: HashMap::new(),
                    query_params: HashMap::new(),
                    path_params: HashMap::from([("id".to_string(), "42".to_string())]),
                    body: Vec::new(),
                },
            },
        };
        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed.id, id);
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_client_message_roundtrip() {
        let msg = ClientMessage {
            id: CorrelationId::new(),
            content: ClientContent::HttpResponse {
                response: HttpResponse {
                    status: 404,
                    headers: HashMap::new(),
                    body: b"not found".to_vec(),
                },
            },
        };
        let parsed = ClientMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_declaration_identifier() {
        let decl = ResourceDeclaration::Bucket {
            name: "images".to_string(),
        };
        let id = decl.identifier();
        assert_eq!(id.resource_type, ResourceType::Bucket);
        assert_eq!(id.name, "images");
    }

    #[test]
    fn test_policy_declaration_identifier() {
        let decl = ResourceDeclaration::Policy {
            actions: vec![Action::TopicPublish],
            resources: vec![ResourceIdentifier::new(ResourceType::Topic, "orders")],
        };
        let id = decl.identifier();
        assert_eq!(id.resource_type, ResourceType::Policy);
        assert_eq!(id.name, "topic/orders");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(ServerMessage::from_json("{not json").is_err());
        assert!(ClientMessage::from_json("{\"id\":\"nope\"}").is_err());
    }

    #[test]
    fn test_http_response_default_is_success() {
        let res = HttpResponse::default();
        assert_eq!(res.status, 200);
        assert!(res.body.is_empty());
    }
}
