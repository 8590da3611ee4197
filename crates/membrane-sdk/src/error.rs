//! Error types for the membrane SDK.

use thiserror::Error;

use crate::worker::WorkerError;

/// Errors that can occur in SDK operations outside a running worker.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Could not establish the membrane connection.
    #[error("membrane connection failed: {0}")]
    Connection(String),

    /// A resource declaration failed.
    #[error("resource declaration failed: {0}")]
    Declaration(String),

    /// Invalid handler shape.
    #[error(transparent)]
    Handler(#[from] crate::handler::HandlerError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] membrane_proto::ProtoError),
}

/// One worker's terminal failure, tagged with its registered name.
#[derive(Debug, Error)]
#[error("{name}: {error}")]
pub struct WorkerFailure {
    /// Name the worker was registered under.
    pub name: String,
    /// The error it terminated with.
    pub error: WorkerError,
}

/// Aggregate failure from [`Manager::run`](crate::manager::Manager::run).
///
/// Every worker runs to its own completion; this collects the ones that
/// failed. An empty failure list is never returned as an error.
#[derive(Debug, Error)]
#[error("{} worker(s) failed: {}", failures.len(), summarize(failures))]
pub struct RunError {
    /// The workers that terminated with an error.
    pub failures: Vec<WorkerFailure>,
}

fn summarize(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
