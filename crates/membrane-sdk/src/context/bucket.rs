//! Bucket listener context.

use membrane_proto::{
    BucketEvent, BucketEventResponse, BucketEventType, ClientContent, ClientMessage,
    CorrelationId, ServerContent, ServerMessage,
};

use super::{ContextError, DomainContext, Extras};
use crate::handler::HandlerError;

/// Context for one blob event delivered to a bucket listener.
#[derive(Debug)]
pub struct BucketContext {
    id: CorrelationId,
    event: BucketEvent,
    response: BucketEventResponse,
    extras: Extras,
}

impl BucketContext {
    /// Bucket the event occurred in.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.event.bucket
    }

    /// Key of the affected file.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.event.key
    }

    /// What happened to the file.
    #[must_use]
    pub const fn event_type(&self) -> BucketEventType {
        self.event.event_type
    }

    /// Invocation-scoped side channel.
    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

impl DomainContext for BucketContext {
    const KIND: &'static str = "bucket_event";

    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError> {
        match msg.content {
            ServerContent::BucketEvent { event } => Ok(Self {
                id: msg.id,
                event,
                response: BucketEventResponse { success: true },
                extras: Extras::default(),
            }),
            other => Err(ContextError::UnexpectedMessage {
                expected: Self::KIND,
                got: other.kind(),
            }),
        }
    }

    fn into_client_message(self) -> ClientMessage {
        ClientMessage {
            id: self.id,
            content: ClientContent::BucketEventResponse {
                response: self.response,
            },
        }
    }

    fn record_error(&mut self, _err: &HandlerError) {
        self.response.success = false;
    }

    fn correlation_id(&self) -> CorrelationId {
        self.id
    }
}
