//! Per-domain request/response contexts.
//!
//! A context is created fresh for every inbound server message, handed to
//! the user handler, and turned back into exactly one client message. It is
//! never reused across invocations.

use std::collections::HashMap;

use membrane_proto::{ClientMessage, CorrelationId, ServerMessage};
use serde_json::Value;
use thiserror::Error;

use crate::handler::HandlerError;

mod api;
mod bucket;
mod job;
mod schedule;
mod topic;
mod websocket;

pub use api::{ApiContext, ApiRequest};
pub use bucket::BucketContext;
pub use job::JobContext;
pub use schedule::ScheduleContext;
pub use topic::TopicContext;
pub use websocket::WebsocketContext;

/// Errors raised while building a context from a server message.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The message payload does not match this worker's domain.
    #[error("unhandled server message: expected {expected}, got {got}")]
    UnexpectedMessage {
        /// Payload kind this domain handles.
        expected: &'static str,
        /// Payload kind that actually arrived.
        got: &'static str,
    },
}

/// Open-ended side channel for passing state between handler layers within
/// a single invocation. Discarded with the context.
#[derive(Debug, Default)]
pub struct Extras(HashMap<String, Value>);

impl Extras {
    /// Store a value under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Look up a previously stored value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// One domain's view of a request/response exchange.
///
/// Implementations tie an inbound payload to a mutable response and echo
/// the originating correlation id on the way out.
pub trait DomainContext: Send + Sized {
    /// Payload kind this domain handles, for diagnostics.
    const KIND: &'static str;

    /// Build a context from an inbound message.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not this domain's request kind.
    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError>;

    /// Serialize the (possibly handler-mutated) response, echoing the
    /// original correlation id.
    fn into_client_message(self) -> ClientMessage;

    /// Flip the response into its failure state. Transmits nothing.
    fn record_error(&mut self, err: &HandlerError);

    /// The correlation id of the originating request.
    fn correlation_id(&self) -> CorrelationId;
}
