//! Schedule resource.

use std::sync::Arc;

use membrane_proto::{RegistrationRequest, ResourceDeclaration, SchedulePolicy};

use super::paths;
use crate::connection::Connection;
use crate::context::ScheduleContext;
use crate::error::SdkError;
use crate::handler::{Handler, HandlerError};
use crate::manager::Manager;
use crate::worker::StreamWorker;

/// A declared schedule. Binds one handler per firing policy.
#[derive(Debug)]
pub struct Schedule {
    manager: &'static Manager,
    connection: Arc<Connection>,
    name: String,
}

impl Schedule {
    /// Declare a schedule on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a schedule on an explicit manager.
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
            ResourceDeclaration::Schedule { name: name.clone() },
        )
        .await?;
        let connection = manager.connection().await?;
        Ok(Self {
            manager,
            connection,
            name,
        })
    }

    /// Fire every `interval_secs` seconds.
    pub fn every(
        &self,
        interval_secs: u64,
        handler: impl Fn(&mut ScheduleContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.bind(SchedulePolicy::Rate { interval_secs }, handler);
    }

    /// Fire on a server-evaluated cron expression.
    pub fn cron(
        &self,
        expression: impl Into<String>,
        handler: impl Fn(&mut ScheduleContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.bind(
            SchedulePolicy::Cron {
                expression: expression.into(),
            },
            handler,
        );
    }

    fn bind(
        &self,
        policy: SchedulePolicy,
        handler: impl Fn(&mut ScheduleContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        let registration = RegistrationRequest::Schedule {
            schedule: self.name.clone(),
            policy,
        };
        self.manager.add_worker(
            format!("schedule:{}", self.name),
            Box::new(StreamWorker::new(
                Arc::clone(&self.connection),
                paths::SCHEDULES,
                registration,
                Handler::new(handler),
            )),
        );
    }
}
