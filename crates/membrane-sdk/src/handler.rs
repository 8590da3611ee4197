//! Handler normalization.
//!
//! Application authors can supply callbacks in a handful of shapes; every
//! shape is adapted into the one canonical [`Handler`] the dispatch loop
//! invokes. Preferred constructors resolve the shape at compile time;
//! [`Handler::from_any`] is the runtime fallback for dynamic registration.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors produced by handler adaptation or by user handlers themselves.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The supplied callback is none of the supported shapes.
    #[error("invalid handler type: {0}")]
    InvalidHandlerType(String),

    /// The user handler reported a failure.
    #[error("handler failed: {0}")]
    Failed(String),
}

impl HandlerError {
    /// Create a user-side failure.
    #[must_use]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Canonical handler: user logic for one domain context.
///
/// Immutable after construction and cheap to clone; the worker that wraps
/// it owns the only long-lived copy.
pub struct Handler<C> {
    inner: Arc<dyn Fn(&mut C) -> Result<(), HandlerError> + Send + Sync>,
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl<C: 'static> Handler<C> {
    /// Wrap an already-canonical callback.
    pub fn new(f: impl Fn(&mut C) -> Result<(), HandlerError> + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Adapt a no-argument, no-return callback.
    pub fn from_fn(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(move |_| {
            f();
            Ok(())
        })
    }

    /// Adapt a no-argument, fallible callback.
    pub fn from_fallible_fn(
        f: impl Fn() -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |_| f())
    }

    /// Adapt a context-taking, no-return callback.
    pub fn from_ctx_fn(f: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        Self::new(move |ctx| {
            f(ctx);
            Ok(())
        })
    }

    /// Adapt a callback whose shape is only known at runtime.
    ///
    /// Accepts function pointers of the four supported signatures, or an
    /// already-canonical `Handler`. Anything else fails with
    /// [`HandlerError::InvalidHandlerType`]; this function never panics.
    ///
    /// # Errors
    ///
    /// Returns an error identifying the unsupported shape.
    pub fn from_any(value: Box<dyn Any + Send + Sync>) -> Result<Self, HandlerError> {
        let value = match value.downcast::<Self>() {
            Ok(handler) => return Ok(*handler),
            Err(other) => other,
        };
        let value = match value.downcast::<fn()>() {
            Ok(f) => return Ok(Self::from_fn(*f)),
            Err(other) => other,
        };
        let value = match value.downcast::<fn() -> Result<(), HandlerError>>() {
            Ok(f) => return Ok(Self::from_fallible_fn(*f)),
            Err(other) => other,
        };
        let value = match value.downcast::<fn(&mut C)>() {
            Ok(f) => return Ok(Self::from_ctx_fn(*f)),
            Err(other) => other,
        };
        match value.downcast::<fn(&mut C) -> Result<(), HandlerError>>() {
            Ok(f) => Ok(Self::new(*f)),
            Err(_) => Err(HandlerError::InvalidHandlerType(
                "expected fn(), fn() -> Result, fn(&mut Context), \
                 fn(&mut Context) -> Result, or Handler"
                    .to_string(),
            )),
        }
    }

    /// Invoke the handler against one context.
    ///
    /// # Errors
    ///
    /// Returns whatever error the user callback reports.
    pub fn invoke(&self, ctx: &mut C) -> Result<(), HandlerError> {
        (self.inner)(ctx)
    }
}
