//! Batch job context.

use membrane_proto::{
    ClientContent, ClientMessage, CorrelationId, JobRequest, JobResponse, ServerContent,
    ServerMessage,
};
use serde_json::Value;

use super::{ContextError, DomainContext, Extras};
use crate::handler::HandlerError;

/// Context for one batch job invocation.
#[derive(Debug)]
pub struct JobContext {
    id: CorrelationId,
    request: JobRequest,
    response: JobResponse,
    extras: Extras,
}

impl JobContext {
    /// Name of the job being invoked.
    #[must_use]
    pub fn job(&self) -> &str {
        &self.request.job
    }

    /// Structured job input.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.request.data
    }

    /// Invocation-scoped side channel.
    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

impl DomainContext for JobContext {
    const KIND: &'static str = "job_request";

    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError> {
        match msg.content {
            ServerContent::JobRequest { request } => Ok(Self {
                id: msg.id,
                request,
                response: JobResponse { success: true },
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
            content: ClientContent::JobResponse {
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
