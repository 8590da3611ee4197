//! Process-wide worker registry and run loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use membrane_proto::{ResourceDeclaration, ResourceIdentifier};
use tokio::sync::{OnceCell, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SdkConfig;
use crate::connection::Connection;
use crate::error::{RunError, SdkError, WorkerFailure};
use crate::worker::{Worker, WorkerError};

static GLOBAL: OnceLock<Manager> = OnceLock::new();

/// One-shot result of a fire-and-forget resource declaration.
///
/// Must be awaited exactly once via [`wait`](Self::wait). The background
/// declaration task completes whether or not anyone waits, but dropping
/// the handle without waiting discards the outcome (and logs a warning).
#[must_use = "a registration result must be awaited exactly once"]
#[derive(Debug)]
pub struct RegistrationHandle {
    rx: Option<oneshot::Receiver<Result<ResourceIdentifier, SdkError>>>,
}

impl RegistrationHandle {
    /// Wait for the declaration outcome, consuming the handle.
    ///
    /// # Errors
    ///
    /// Returns the declaration failure, or an error if the background
    /// task disappeared without reporting.
    pub async fn wait(mut self) -> Result<ResourceIdentifier, SdkError> {
        match self.rx.take() {
            Some(rx) => rx.await.map_err(|_| {
                SdkError::Declaration("declaration task dropped its result".to_string())
            })?,
            None => Err(SdkError::Declaration(
                "registration result already consumed".to_string(),
            )),
        }
    }
}

impl Drop for RegistrationHandle {
    fn drop(&mut self) {
        if self.rx.is_some() {
            warn!("registration result dropped without being awaited");
        }
    }
}

/// Owns every declared worker for a process and runs them to completion.
pub struct Manager {
    config: SdkConfig,
    workers: Mutex<HashMap<String, Box<dyn Worker>>>,
    connection: Arc<OnceCell<Arc<Connection>>>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .field("workers", &self.worker_count())
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Create a manager with an explicit configuration.
    #[must_use]
    pub fn new(config: SdkConfig) -> Self {
        Self {
            config,
            workers: Mutex::new(HashMap::new()),
            connection: Arc::new(OnceCell::new()),
        }
    }

    /// The process-wide default manager, configured from the environment
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment configuration is invalid.
    pub fn global() -> Result<&'static Self, SdkError> {
        if let Some(manager) = GLOBAL.get() {
            return Ok(manager);
        }
        let manager = Self::new(SdkConfig::from_env()?);
        Ok(GLOBAL.get_or_init(|| manager))
    }

    /// The configuration this manager was built with.
    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Register a worker under a unique name.
    ///
    /// Names are used only for collision avoidance and diagnostics. The
    /// last registration under a name wins; replacing an existing worker
    /// is logged, since it is almost always an accident.
    pub fn add_worker(&self, name: impl Into<String>, worker: Box<dyn Worker>) {
        let name = name.into();
        let mut workers = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if workers.insert(name.clone(), worker).is_some() {
            warn!(worker = %name, "replacing previously registered worker");
        }
    }

    /// Number of registered workers awaiting [`run`](Self::run).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The shared connection, established on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connection(&self) -> Result<Arc<Connection>, SdkError> {
        Self::shared_connection(&self.connection, &self.config).await
    }

    async fn shared_connection(
        cell: &OnceCell<Arc<Connection>>,
        config: &SdkConfig,
    ) -> Result<Arc<Connection>, SdkError> {
        cell.get_or_try_init(|| async { Connection::establish(config).await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Declare a resource, fire-and-forget style.
    ///
    /// The declaration runs on a background task; the returned handle
    /// completes exactly once with the assigned identifier or the error.
    pub fn register_resource(&self, declaration: ResourceDeclaration) -> RegistrationHandle {
        let (tx, rx) = oneshot::channel();
        let cell = Arc::clone(&self.connection);
        let config = self.config.clone();

        tokio::spawn(async move {
            let result = async {
                let conn = Self::shared_connection(&cell, &config).await?;
                conn.declare(declaration).await
            }
            .await;
            // The receiver may already be gone; the task still completes.
            let _ = tx.send(result);
        });

        RegistrationHandle { rx: Some(rx) }
    }

    /// Start every registered worker concurrently and block until all of
    /// them have returned.
    ///
    /// One worker's failure never stops its siblings; every worker runs
    /// to its own completion and the failures are aggregated. In
    /// build/discovery mode, end-of-stream-shaped errors are expected
    /// (the server hangs up after registration) and are filtered out of
    /// the aggregate.
    ///
    /// # Errors
    ///
    /// Returns the combined failures of every worker that did not
    /// terminate cleanly.
    pub async fn run(&self, token: CancellationToken) -> Result<(), RunError> {
        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        info!(count = workers.len(), mode = ?self.config.mode, "starting workers");

        let mut handles = Vec::with_capacity(workers.len());
        for (name, worker) in workers {
            handles.push((name, tokio::spawn(worker.start(token.clone()))));
        }

        let mut failures = Vec::new();
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(WorkerError::Panicked(e.to_string())),
            };
            match result {
                Ok(()) => debug!(worker = %name, "worker finished"),
                Err(error) if self.config.mode.is_build() && error.is_connection_closed() => {
                    debug!(worker = %name, "discovery stream closed by server");
                }
                Err(error) => {
                    warn!(worker = %name, error = %error, "worker failed");
                    failures.push(WorkerFailure { name, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RunError { failures })
        }
    }
}
