//! Secret store resource.
//!
//! Declaration-only, like queues: the SDK registers the secret and the
//! process's permissions on it.

use membrane_proto::{Action, ResourceDeclaration};

use crate::error::SdkError;
use crate::manager::Manager;

/// A declared secret store entry.
#[derive(Debug)]
pub struct Secret {
    manager: &'static Manager,
    name: String,
}

impl Secret {
    /// Declare a secret on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare a secret on an explicit manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn with_manager(
        manager: &'static Manager,
        name: impl Into<String>,
    ) -> Result<Self, SdkError> {
        let name = name.into();
        super::declare(manager, ResourceDeclaration::Secret { name: name.clone() }).await?;
        Ok(Self { manager, name })
    }

    /// Request permission for this process to perform `actions` on the
    /// secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy declaration is not acknowledged.
    pub async fn allow(&self, actions: Vec<Action>) -> Result<(), SdkError> {
        super::declare_policy(
            self.manager,
            ResourceDeclaration::Secret {
                name: self.name.clone(),
            }
            .identifier(),
            actions,
        )
        .await
    }
}
