//! Batch job resource.

use std::sync::Arc;

use membrane_proto::{RegistrationRequest, ResourceDeclaration};

use super::paths;
use crate::connection::Connection;
use crate::context::JobContext;
use crate::error::SdkError;
use crate::handler::{Handler, HandlerError};
use crate::manager::Manager;
use crate::worker::StreamWorker;

/// A declared batch job definition.
#[derive(Debug)]
pub struct Job {
    manager: &'static Manager,
    connection: Arc<Connection>,
    name: String,
}

impl Job {
    /// Declare a job on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a job on an explicit manager.
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
            ResourceDeclaration::BatchJob { name: name.clone() },
        )
        .await?;
        let connection = manager.connection().await?;
        Ok(Self {
            manager,
            connection,
            name,
        })
    }

    /// Bind the handler that runs each job invocation.
    pub fn handler(
        &self,
        handler: impl Fn(&mut JobContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        let registration = RegistrationRequest::Job {
            job: self.name.clone(),
        };
        self.manager.add_worker(
            format!("job:{}", self.name),
            Box::new(StreamWorker::new(
                Arc::clone(&self.connection),
                paths::JOBS,
                registration,
                Handler::new(handler),
            )),
        );
    }
}
