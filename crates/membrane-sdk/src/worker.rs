//! Workers: one long-lived stream session bound to one handler.

use std::sync::Arc;

use async_trait::async_trait;
use membrane_proto::{ClientMessage, RegistrationRequest, ServerMessage};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::context::DomainContext;
use crate::dispatch::serve;
use crate::handler::Handler;
use crate::stream::StreamError;

/// Terminal errors of one worker's dispatch loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The stream failed.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// An inbound message matched no known payload for this domain.
    #[error("unhandled server message: {0}")]
    UnhandledMessage(String),

    /// The worker task panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl WorkerError {
    /// Whether this is the end-of-stream-shaped error that build/discovery
    /// runs expect (the server hangs up right after registration).
    #[must_use]
    pub const fn is_connection_closed(&self) -> bool {
        matches!(self, Self::Stream(StreamError::ConnectionClosed))
    }
}

/// A unit the manager can run: one stream session, started at most once.
///
/// `start` consumes the worker, so restarting one is unrepresentable.
#[async_trait]
pub trait Worker: Send {
    /// Run the worker's dispatch loop to completion.
    async fn start(self: Box<Self>, token: CancellationToken) -> Result<(), WorkerError>;
}

/// Map one inbound server message to the client message to send back.
///
/// Registration acks carry no work and produce nothing; a payload outside
/// the worker's domain is fatal; a handler error is captured into the
/// response and the loop continues.
pub(crate) fn dispatch_message<C: DomainContext>(
    handler: &Handler<C>,
    msg: ServerMessage,
) -> Result<Option<ClientMessage>, WorkerError>
where
    C: 'static,
{
    if msg.is_registration_ack() {
        debug!("registration acknowledged");
        return Ok(None);
    }

    let mut ctx = C::from_server_message(msg)
        .map_err(|e| WorkerError::UnhandledMessage(e.to_string()))?;

    if let Err(e) = handler.invoke(&mut ctx) {
        warn!(kind = C::KIND, id = %ctx.correlation_id(), error = %e, "handler failed");
        ctx.record_error(&e);
    }

    Ok(Some(ctx.into_client_message()))
}

/// Binds a registration descriptor, a stream factory, and a handler.
///
/// The descriptor and handler are immutable after construction; the
/// manager runs the worker exactly once.
pub struct StreamWorker<C> {
    connection: Arc<Connection>,
    path: String,
    registration: RegistrationRequest,
    handler: Handler<C>,
}

impl<C: DomainContext + 'static> StreamWorker<C> {
    /// Create a worker for the given RPC path.
    #[must_use]
    pub fn new(
        connection: Arc<Connection>,
        path: impl Into<String>,
        registration: RegistrationRequest,
        handler: Handler<C>,
    ) -> Self {
        Self {
            connection,
            path: path.into(),
            registration,
            handler,
        }
    }
}

#[async_trait]
impl<C: DomainContext + 'static> Worker for StreamWorker<C> {
    async fn start(self: Box<Self>, token: CancellationToken) -> Result<(), WorkerError> {
        let Self {
            connection,
            path,
            registration,
            handler,
        } = *self;

        debug!(path = %path, "starting worker");
        serve(
            token,
            || async move { connection.open_stream(&path).await },
            ClientMessage::registration(registration),
            move |msg: ServerMessage| dispatch_message(&handler, msg),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApiContext;
    use crate::handler::HandlerError;
    use membrane_proto::{
        ClientContent, CorrelationId, HttpRequest, ServerContent,
    };
    use std::collections::HashMap;

    fn http_request(id: CorrelationId) -> ServerMessage {
        ServerMessage {
            id,
            content: ServerContent::HttpRequest {
                request: HttpRequest {
                    method: "POST".to_string(),
                    path: "/orders".to_string(),
                    headers: HashMap::new(),
                    query_params: HashMap::new(),
                    path_params: HashMap::new(),
                    body: b"{}".to_vec(),
                },
            },
        }
    }

    #[test]
    fn test_registration_ack_produces_nothing() {
        let handler = Handler::from_ctx_fn(|_: &mut ApiContext| {});
        let msg = ServerMessage::registration_ack(CorrelationId::new());
        let out = dispatch_message(&handler, msg).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_successful_handler_produces_success_reply() {
        let handler = Handler::from_ctx_fn(|ctx: &mut ApiContext| ctx.set_status(201));
        let id = CorrelationId::new();
        let out = dispatch_message(&handler, http_request(id)).unwrap().unwrap();
        assert_eq!(out.id, id);
        match out.content {
            ClientContent::HttpResponse { response } => assert_eq!(response.status, 201),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_handler_error_is_not_fatal_and_reply_carries_failure() {
        let handler =
            Handler::<ApiContext>::from_fallible_fn(|| Err(HandlerError::failed("boom")));
        let out = dispatch_message(&handler, http_request(CorrelationId::new()))
            .unwrap()
            .unwrap();
        match out.content {
            ClientContent::HttpResponse { response } => {
                assert_eq!(response.status, 500);
                assert!(String::from_utf8(response.body).unwrap().contains("boom"));
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_foreign_payload_is_fatal() {
        let handler = Handler::from_ctx_fn(|_: &mut ApiContext| {});
        let msg = ServerMessage {
            id: CorrelationId::new(),
            content: ServerContent::ScheduleTick {
                tick: membrane_proto::ScheduleTick {
                    schedule: "x".to_string(),
                },
            },
        };
        let err = dispatch_message(&handler, msg).unwrap_err();
        assert!(matches!(err, WorkerError::UnhandledMessage(_)));
        assert!(err.to_string().contains("unhandled server message"));
    }
}
