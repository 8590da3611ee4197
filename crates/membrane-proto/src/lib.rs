//! # membrane-proto
//!
//! Protocol definitions for membrane client-server communication.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod messages;
pub mod types;

pub use error::ProtoError;
pub use messages::{
    BucketEvent, BucketEventResponse, ClientContent, ClientMessage, DeclarationAck, HttpRequest,
    HttpResponse, JobRequest, JobResponse, RegistrationRequest, RegistrationResponse,
    ResourceDeclaration, ScheduleResponse, ScheduleTick, ServerContent, ServerMessage,
    TopicMessage, TopicResponse, WebsocketEvent, WebsocketEventResponse,
};
pub use types::{
    Action, BucketEventType, CorrelationId, ResourceIdentifier, ResourceType, SchedulePolicy,
    WebsocketEventType,
};
