//! Shared connection to the membrane server.
//!
//! One `Connection` is established per process (lazily, by the manager) and
//! shared by every worker. Each worker opens its own logical stream; the
//! connection itself only owns the control channel used for resource
//! declarations.

use membrane_proto::{ClientMessage, ResourceDeclaration, ResourceIdentifier, ServerContent};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::stream::{StreamError, WorkStream, WsStream};

/// RPC path of the resource declaration control channel.
const CONTROL_PATH: &str = "membrane/v1/resources";

/// Established connection to the membrane server.
#[derive(Debug)]
pub struct Connection {
    endpoint: String,
    control: Mutex<WsStream>,
}

impl Connection {
    /// Connect to the server named by `config`.
    ///
    /// Establishes the control channel eagerly: an unreachable server is a
    /// construction-time failure, not a deferred one.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or unreachable.
    pub async fn establish(config: &SdkConfig) -> Result<Self, SdkError> {
        config.validate()?;

        let control = Self::connect(&config.endpoint, CONTROL_PATH)
            .await
            .map_err(|e| SdkError::Connection(e.to_string()))?;

        info!(endpoint = %config.endpoint, "connected to membrane");
        Ok(Self {
            endpoint: config.endpoint.clone(),
            control: Mutex::new(control),
        })
    }

    async fn connect(endpoint: &str, path: &str) -> Result<WsStream, StreamError> {
        let url = format!("{}/{path}", endpoint.trim_end_matches('/'));
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| StreamError::Connect(format!("{url}: {e}")))?;
        debug!(url = %url, "stream opened");
        Ok(WsStream::new(ws))
    }

    /// Open a fresh worker stream for the given RPC path.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    pub async fn open_stream(&self, path: &str) -> Result<WsStream, StreamError> {
        Self::connect(&self.endpoint, path).await
    }

    /// Declare one resource and wait for the server's ack.
    ///
    /// Declarations are serialized over the control channel; the mutex is
    /// held for the duration of one request/response exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the server replies with
    /// anything other than a matching ack.
    pub async fn declare(
        &self,
        declaration: ResourceDeclaration,
    ) -> Result<ResourceIdentifier, SdkError> {
        let msg = ClientMessage::declaration(declaration);
        let id = msg.id;

        let mut control = self.control.lock().await;
        control
            .send(msg)
            .await
            .map_err(|e| SdkError::Declaration(e.to_string()))?;

        match control
            .receive()
            .await
            .map_err(|e| SdkError::Declaration(e.to_string()))?
        {
            Some(reply) => match reply.content {
                ServerContent::DeclarationAck { ack } if reply.id == id => {
                    info!(resource = %ack.identifier, "resource declared");
                    Ok(ack.identifier)
                }
                other => Err(SdkError::Declaration(format!(
                    "expected declaration ack for {id}, got {}",
                    other.kind()
                ))),
            },
            None => Err(SdkError::Declaration(
                "control channel closed before ack".to_string(),
            )),
        }
    }
}
