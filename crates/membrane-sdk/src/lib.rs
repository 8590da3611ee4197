//! # membrane-sdk
//!
//! Client SDK for membrane applications.
//!
//! An application declares its resources (APIs, topics, schedules, buckets,
//! websockets, batch jobs, queues, secrets) against a membrane server, binds
//! handlers to the ones that carry work, and then calls
//! [`Manager::run`](manager::Manager::run) to serve every bound handler
//! concurrently over websocket streams until cancelled.
//!
//! ```no_run
//! use membrane_sdk::manager::Manager;
//! use membrane_sdk::resources::Api;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Api::new("main").await?;
//! api.get("/hello", |ctx| {
//!     ctx.set_body(b"hello".to_vec());
//!     Ok(())
//! });
//!
//! Manager::global()?.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod manager;
pub mod resources;
pub mod stream;
pub mod worker;

pub use config::{RunMode, SdkConfig};
pub use connection::Connection;
pub use context::{
    ApiContext, BucketContext, DomainContext, JobContext, ScheduleContext, TopicContext,
    WebsocketContext,
};
pub use error::{RunError, SdkError, WorkerFailure};
pub use handler::{Handler, HandlerError};
pub use manager::{Manager, RegistrationHandle};
pub use worker::{StreamWorker, Worker, WorkerError};
