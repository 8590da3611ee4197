//! Topic subscription context.

use membrane_proto::{
    ClientContent, ClientMessage, CorrelationId, ServerContent, ServerMessage, TopicMessage,
    TopicResponse,
};
use serde_json::Value;

use super::{ContextError, DomainContext, Extras};
use crate::handler::HandlerError;

/// Context for one message delivered to a topic subscription.
#[derive(Debug)]
pub struct TopicContext {
    id: CorrelationId,
    message: TopicMessage,
    response: TopicResponse,
    extras: Extras,
}

impl TopicContext {
    /// Topic the message was published to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.message.topic
    }

    /// Structured message payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.message.payload
    }

    /// Whether the delivery is currently marked successful.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.response.success
    }

    /// Invocation-scoped side channel.
    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

impl DomainContext for TopicContext {
    const KIND: &'static str = "topic_message";

    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError> {
        match msg.content {
            ServerContent::TopicMessage { message } => Ok(Self {
                id: msg.id,
                message,
                response: TopicResponse { success: true },
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
            content: ClientContent::TopicResponse {
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
