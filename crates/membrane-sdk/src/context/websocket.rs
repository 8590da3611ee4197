//! Websocket event context.

use membrane_proto::{
    ClientContent, ClientMessage, CorrelationId, ServerContent, ServerMessage, WebsocketEvent,
    WebsocketEventResponse, WebsocketEventType,
};

use super::{ContextError, DomainContext, Extras};
use crate::handler::HandlerError;

/// Context for one websocket lifecycle or message event.
#[derive(Debug)]
pub struct WebsocketContext {
    id: CorrelationId,
    event: WebsocketEvent,
    response: WebsocketEventResponse,
    extras: Extras,
}

impl WebsocketContext {
    /// Socket the event occurred on.
    #[must_use]
    pub fn socket(&self) -> &str {
        &self.event.socket
    }

    /// Server-assigned connection id.
    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.event.connection_id
    }

    /// What happened.
    #[must_use]
    pub const fn event_type(&self) -> WebsocketEventType {
        self.event.event_type
    }

    /// Message body. Empty for connect/disconnect events.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.event.body
    }

    /// First value of a connect-time query parameter, if present.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.event
            .query_params
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Refuse the connection. Only meaningful on connect events.
    pub fn reject(&mut self) {
        self.response.success = false;
        self.response.reject = true;
    }

    /// Invocation-scoped side channel.
    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

impl DomainContext for WebsocketContext {
    const KIND: &'static str = "websocket_event";

    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError> {
        match msg.content {
            ServerContent::WebsocketEvent { event } => Ok(Self {
                id: msg.id,
                event,
                response: WebsocketEventResponse {
                    success: true,
                    reject: false,
                },
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
            content: ClientContent::WebsocketEventResponse {
                response: self.response,
            },
        }
    }

    fn record_error(&mut self, _err: &HandlerError) {
        self.response.success = false;
        // A failed connect handler refuses the connection.
        if self.event.event_type == WebsocketEventType::Connect {
            self.response.reject = true;
        }
    }

    fn correlation_id(&self) -> CorrelationId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn event(event_type: WebsocketEventType) -> ServerMessage {
        ServerMessage {
            id: CorrelationId::new(),
            content: ServerContent::WebsocketEvent {
                event: WebsocketEvent {
                    socket: "chat".to_string(),
                    connection_id: "conn-1".to_string(),
                    event_type,
                    query_params: HashMap::new(),
                    body: b"hello".to_vec(),
                },
            },
        }
    }

    #[test]
    fn test_failed_connect_handler_rejects() {
        let mut ctx =
            WebsocketContext::from_server_message(event(WebsocketEventType::Connect)).unwrap();
        ctx.record_error(&HandlerError::failed("not authorized"));
        match ctx.into_client_message().content {
            ClientContent::WebsocketEventResponse { response } => {
                assert!(!response.success);
                assert!(response.reject);
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_failed_message_handler_does_not_reject() {
        let mut ctx =
            WebsocketContext::from_server_message(event(WebsocketEventType::Message)).unwrap();
        ctx.record_error(&HandlerError::failed("oops"));
        match ctx.into_client_message().content {
            ClientContent::WebsocketEventResponse { response } => {
                assert!(!response.success);
                assert!(!response.reject);
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_reject() {
        let mut ctx =
            WebsocketContext::from_server_message(event(WebsocketEventType::Connect)).unwrap();
        ctx.reject();
        match ctx.into_client_message().content {
            ClientContent::WebsocketEventResponse { response } => assert!(response.reject),
            other => panic!("unexpected content: {other:?}"),
        }
    }
}
