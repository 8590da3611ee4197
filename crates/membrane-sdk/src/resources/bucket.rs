//! Blob bucket resource.

use std::sync::Arc;

use membrane_proto::{Action, BucketEventType, RegistrationRequest, ResourceDeclaration};

use super::paths;
use crate::connection::Connection;
use crate::context::BucketContext;
use crate::error::SdkError;
use crate::handler::{Handler, HandlerError};
use crate::manager::Manager;
use crate::worker::StreamWorker;

/// A declared blob bucket.
#[derive(Debug)]
pub struct Bucket {
    manager: &'static Manager,
    connection: Arc<Connection>,
    name: String,
}

impl Bucket {
    /// Declare a bucket on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a bucket on an explicit manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn with_manager(
        manager: &'static Manager,
        name: impl Into<String>,
    ) -> Result<Self, SdkError> {
        let name = name.into();
        super::declare(manager, ResourceDeclaration::Bucket { name: name.clone() }).await?;
        let connection = manager.connection().await?;
        Ok(Self {
            manager,
            connection,
            name,
        })
    }

    /// Bind a handler for one kind of blob event.
    pub fn on(
        &self,
        event_type: BucketEventType,
        handler: impl Fn(&mut BucketContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        let registration = RegistrationRequest::BucketListener {
            bucket: self.name.clone(),
            event_type,
        };
        self.manager.add_worker(
            format!("bucket:{}:{event_type}", self.name),
            Box::new(StreamWorker::new(
                Arc::clone(&self.connection),
                paths::BUCKETS,
                registration,
                Handler::new(handler),
            )),
        );
    }

    /// Request permission for this process to perform `actions` on the
    /// bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy declaration is not acknowledged.
    pub async fn allow(&self, actions: Vec<Action>) -> Result<(), SdkError> {
        super::declare_policy(
            self.manager,
            ResourceDeclaration::Bucket {
                name: self.name.clone(),
            }
            .identifier(),
            actions,
        )
        .await
    }
}
