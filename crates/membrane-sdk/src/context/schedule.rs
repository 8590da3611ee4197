//! Schedule tick context.

use membrane_proto::{
    ClientContent, ClientMessage, CorrelationId, ScheduleResponse, ScheduleTick, ServerContent,
    ServerMessage,
};

use super::{ContextError, DomainContext, Extras};
use crate::handler::HandlerError;

/// Context for one schedule firing.
#[derive(Debug)]
pub struct ScheduleContext {
    id: CorrelationId,
    tick: ScheduleTick,
    response: ScheduleResponse,
    extras: Extras,
}

impl ScheduleContext {
    /// Name of the schedule that fired.
    #[must_use]
    pub fn schedule(&self) -> &str {
        &self.tick.schedule
    }

    /// Invocation-scoped side channel.
    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

impl DomainContext for ScheduleContext {
    const KIND: &'static str = "schedule_tick";

    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError> {
        match msg.content {
            ServerContent::ScheduleTick { tick } => Ok(Self {
                id: msg.id,
                tick,
                response: ScheduleResponse { success: true },
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
            content: ClientContent::ScheduleResponse {
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
