//! Websocket resource.

use std::sync::Arc;

use membrane_proto::{RegistrationRequest, ResourceDeclaration, WebsocketEventType};

use super::paths;
use crate::connection::Connection;
use crate::context::WebsocketContext;
use crate::error::SdkError;
use crate::handler::{Handler, HandlerError};
use crate::manager::Manager;
use crate::worker::StreamWorker;

/// A declared websocket endpoint. One worker per event kind.
#[derive(Debug)]
pub struct Websocket {
    manager: &'static Manager,
    connection: Arc<Connection>,
    name: String,
}

impl Websocket {
    /// Declare a websocket on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a websocket on an explicit manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn with_manager(
        manager: &'static Manager,
        name: impl Into<String>,
    ) -> Result<Self, SdkError> {
        let name = name.into();
        super::declare(
            manager,
            ResourceDeclaration::Websocket { name: name.clone() },
        )
        .await?;
        let connection = manager.connection().await?;
        Ok(Self {
            manager,
            connection,
            name,
        })
    }

    /// Bind a handler for new connections. Failing (or calling
    /// [`reject`](WebsocketContext::reject) in) the handler refuses the
    /// connection.
    pub fn on_connect(
        &self,
        handler: impl Fn(&mut WebsocketContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.bind(WebsocketEventType::Connect, handler);
    }

    /// Bind a handler for closed connections.
    pub fn on_disconnect(
        &self,
        handler: impl Fn(&mut WebsocketContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.bind(WebsocketEventType::Disconnect, handler);
    }

    /// Bind a handler for inbound client messages.
    pub fn on_message(
        &self,
        handler: impl Fn(&mut WebsocketContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.bind(WebsocketEventType::Message, handler);
    }

    fn bind(
        &self,
        event_type: WebsocketEventType,
        handler: impl Fn(&mut WebsocketContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        let registration = RegistrationRequest::Websocket {
            socket: self.name.clone(),
            event_type,
        };
        self.manager.add_worker(
            format!("websocket:{}:{event_type}", self.name),
            Box::new(StreamWorker::new(
                Arc::clone(&self.connection),
                paths::WEBSOCKETS,
                registration,
                Handler::new(handler),
            )),
        );
    }
}
