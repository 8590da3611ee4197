//! HTTP API resource.

use std::sync::Arc;

use membrane_proto::{RegistrationRequest, ResourceDeclaration};

use super::paths;
use crate::connection::Connection;
use crate::context::ApiContext;
use crate::error::SdkError;
use crate::handler::{Handler, HandlerError};
use crate::manager::Manager;
use crate::worker::StreamWorker;

const ALL_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"];

/// A declared HTTP API. Routes bind one handler per method/path pair.
#[derive(Debug)]
pub struct Api {
    manager: &'static Manager,
    connection: Arc<Connection>,
    name: String,
}

impl Api {
    /// Declare an API on the process-wide manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn new(name: impl Into<String>) -> Result<Self, SdkError> {
        Self::with_manager(Manager::global()?, name).await
    }

    /// Declare an API on an explicit manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is not acknowledged.
    pub async fn with_manager(
        manager: &'static Manager,
        name: impl Into<String>,
    ) -> Result<Self, SdkError> {
        let name = name.into();
        super::declare(manager, ResourceDeclaration::Api { name: name.clone() }).await?;
        let connection = manager.connection().await?;
        Ok(Self {
            manager,
            connection,
            name,
        })
    }

    /// Serve `GET` requests on `path`.
    pub fn get(
        &self,
        path: impl Into<String>,
        handler: impl Fn(&mut ApiContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.route(path, &["GET"], handler);
    }

    /// Serve `POST` requests on `path`.
    pub fn post(
        &self,
        path: impl Into<String>,
        handler: impl Fn(&mut ApiContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.route(path, &["POST"], handler);
    }

    /// Serve `PUT` requests on `path`.
    pub fn put(
        &self,
        path: impl Into<String>,
        handler: impl Fn(&mut ApiContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.route(path, &["PUT"], handler);
    }

    /// Serve `DELETE` requests on `path`.
    pub fn delete(
        &self,
        path: impl Into<String>,
        handler: impl Fn(&mut ApiContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.route(path, &["DELETE"], handler);
    }

    /// Serve every method on `path` with one handler.
    pub fn all(
        &self,
        path: impl Into<String>,
        handler: impl Fn(&mut ApiContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        self.route(path, ALL_METHODS, handler);
    }

    /// Serve an explicit method set on `path`.
    pub fn route(
        &self,
        path: impl Into<String>,
        methods: &[&str],
        handler: impl Fn(&mut ApiContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) {
        let path = path.into();
        let methods: Vec<String> = methods.iter().map(ToString::to_string).collect();
        let name = worker_name(&self.name, &methods, &path);

        let registration = RegistrationRequest::ApiRoute {
            api: self.name.clone(),
            path,
            methods,
        };
        self.manager.add_worker(
            name,
            Box::new(StreamWorker::new(
                Arc::clone(&self.connection),
                paths::API,
                registration,
                Handler::new(handler),
            )),
        );
    }
}

fn worker_name(api: &str, methods: &[String], path: &str) -> String {
    format!("api:{api}:{}:{path}", methods.join("|"))
}
