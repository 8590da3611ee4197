//! Pub/sub topic resource.

use std::sync::Arc;

use membrane_proto::{Action, RegistrationRequest, ResourceDeclaration};

use super::paths;
use crate::connection::Connection;
use crate::context::TopicContext;
use crate::error::SdkError;
use crate::handler::{Handler, HandlerError};
use crate::manager::Manager;
use crate::worker::StreamWorker;

/// A declared pub/sub topic.
#[derive(Debug)]
pub struct Topic {
    manager: &'static Manager,
    connection: Arc<Connection>,
    name: String,
}

impl Topic {
    /// Declare a topic on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a topic on an explicit manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn with_manager(
        manager: &'static Manager,
        name: impl Into<String>,
    ) -> Result<Self, SdkError> {
        let name = name.into();
        super::declare(manager, ResourceDeclaration::Topic { name: name.clone() }).await?;
        let connection = manager.connection().await?;
        Ok(Self {
            manager,
            connection,
            name,
        })
    }

    /// Bind a handler for every message published to this topic.
    pub fn subscribe(
        &self,
        handler: impl Fn(&mut TopicContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        let registration = RegistrationRequest::Subscription {
            topic: self.name.clone(),
        };
        self.manager.add_worker(
            format!("subscription:{}", self.name),
            Box::new(StreamWorker::new(
                Arc::clone(&self.connection),
                paths::TOPICS,
                registration,
                Handler::new(handler),
            )),
        );
    }

    /// Request permission for this process to publish to the topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy declaration is not acknowledged.
    pub async fn allow_publish(&self) -> Result<(), SdkError> {
        super::declare_policy(
            self.manager,
            ResourceDeclaration::Topic {
                name: self.name.clone(),
            }
            .identifier(),
            vec![Action::TopicPublish],
        )
        .await
    }
}
