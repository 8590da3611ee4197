//! API route context.

use membrane_proto::{
    ClientContent, ClientMessage, CorrelationId, HttpRequest, HttpResponse, ServerContent,
    ServerMessage,
};

use super::{ContextError, DomainContext, Extras};
use crate::handler::HandlerError;

/// Read-only view of an inbound HTTP request.
#[derive(Debug)]
pub struct ApiRequest {
    inner: HttpRequest,
}

impl ApiRequest {
    /// HTTP method, upper case.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Request path as matched.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// First value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// First value of a query parameter, if present.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.inner
            .query_params
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// A path parameter, e.g. `id` for a route `/orders/:id`.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.inner.path_params.get(name).map(String::as_str)
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.inner.body
    }
}

/// Context for one HTTP request arriving on an API route worker.
#[derive(Debug)]
pub struct ApiContext {
    id: CorrelationId,
    request: ApiRequest,
    response: HttpResponse,
    extras: Extras,
}

impl ApiContext {
    /// The inbound request.
    #[must_use]
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    /// Mutable access to the outbound response.
    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    /// Set the response status code.
    pub fn set_status(&mut self, status: u16) {
        self.response.status = status;
    }

    /// Set the response body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.response.body = body.into();
    }

    /// Add a response header value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response
            .headers
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Invocation-scoped side channel.
    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }

    /// Invocation-scoped side channel, read-only.
    #[must_use]
    pub fn extras(&self) -> &Extras {
        &self.extras
    }
}

impl DomainContext for ApiContext {
    const KIND: &'static str = "http_request";

    fn from_server_message(msg: ServerMessage) -> Result<Self, ContextError> {
        match msg.content {
            ServerContent::HttpRequest { request } => Ok(Self {
                id: msg.id,
                request: ApiRequest { inner: request },
                response: HttpResponse::default(),
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
            content: ClientContent::HttpResponse {
                response: self.response,
            },
        }
    }

    fn record_error(&mut self, err: &HandlerError) {
        self.response.status = 500;
        self.response.body = err.to_string().into_bytes();
    }

    fn correlation_id(&self) -> CorrelationId {
        self.id
    }
}
