//! Message queue resource.
//!
//! Queues are declaration-only here: their data-plane calls go through the
//! server's regular request APIs, so the SDK only registers existence and
//! permissions.

use membrane_proto::{Action, ResourceDeclaration};

use crate::error::SdkError;
use crate::manager::Manager;

/// A declared message queue.
#[derive(Debug)]
pub struct Queue {
    manager: &'static Manager,
    name: String,
}

impl Queue {
    /// Declare a queue on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a queue on an explicit manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn with_manager(
        manager: &'static Manager,
        name: impl Into<String>,
    ) -> Result<Self, SdkError> {
        let name = name.into();
        super::declare(manager, ResourceDeclaration::Queue { name: name.clone() }).await?;
        Ok(Self { manager, name })
    }

    /// Request permission for this process to perform `actions` on the
    /// queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy declaration is not acknowledged.
    pub async fn allow(&self, actions: Vec<Action>) -> Result<(), SdkError> {
        super::declare_policy(
            self.manager,
            ResourceDeclaration::Queue {
                name: self.name.clone(),
            }
            .identifier(),
            actions,
        )
        .await
    }
}
