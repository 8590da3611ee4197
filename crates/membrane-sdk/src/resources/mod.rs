//! Resource builders: the user-facing surface of the SDK.
//!
//! Each builder declares its resource on construction (waiting for the
//! server's ack) and registers workers with the manager as handlers are
//! bound. Nothing runs until [`Manager::run`](crate::manager::Manager::run).

mod api;
mod bucket;
mod job;
mod queue;
mod schedule;
mod secret;
mod topic;
mod websocket;

pub use api::Api;
pub use bucket::Bucket;
pub use job::Job;
pub use queue::Queue;
pub use schedule::Schedule;
pub use secret::Secret;
pub use topic::Topic;
pub use websocket::Websocket;

use membrane_proto::{Action, ResourceDeclaration, ResourceIdentifier};

use crate::error::SdkError;
use crate::manager::Manager;

/// RPC paths of the per-domain worker streams.
pub(crate) mod paths {
    pub(crate) const API: &str = "membrane/v1/workers/api";
    pub(crate) const TOPICS: &str = "membrane/v1/workers/topics";
    pub(crate) const SCHEDULES: &str = "membrane/v1/workers/schedules";
    pub(crate) const BUCKETS: &str = "membrane/v1/workers/buckets";
    pub(crate) const WEBSOCKETS: &str = "membrane/v1/workers/websockets";
    pub(crate) const JOBS: &str = "membrane/v1/workers/jobs";
}

/// Declare one resource through the manager and wait for its ack.
pub(crate) async fn declare(
    manager: &Manager,
    declaration: ResourceDeclaration,
) -> Result<ResourceIdentifier, SdkError> {
    manager.register_resource(declaration).wait().await
}

/// Declare a policy granting `actions` on a single resource.
pub(crate) async fn declare_policy(
    manager: &Manager,
    resource: ResourceIdentifier,
    actions: Vec<Action>,
) -> Result<(), SdkError> {
    declare(
        manager,
        ResourceDeclaration::Policy {
            actions,
            resources: vec![resource],
        },
    )
    .await
    .map(|_| ())
}
