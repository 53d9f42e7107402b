//! # Handlers
//!
//! A handler receives the validated request parts as a [`RequestInput`]
//! and produces a JSON value. Every handler result is a deferred value
//! ([`BoxFuture`]); synchronous handlers are adapted with
//! [`sync_handler`], which wraps the immediate result in a ready future.
//! Return validation can therefore always attach itself as a
//! continuation, with no branching on the result's shape.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use zpipe_core::Target;

use crate::error::ApiError;

/// Outcome of a handler invocation.
pub type HandlerResult = Result<Value, ApiError>;

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Fn(RequestInput) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// The request parts a handler sees, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInput {
    /// Path parameters, as an object.
    pub params: Value,
    /// Query string, as an object.
    pub query: Value,
    /// Decoded JSON body, or `null` when empty.
    pub body: Value,
}

impl Default for RequestInput {
    fn default() -> Self {
        Self {
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Null,
        }
    }
}

impl RequestInput {
    /// Build an input from its three parts.
    pub fn new(params: Value, query: Value, body: Value) -> Self {
        Self {
            params,
            query,
            body,
        }
    }

    /// The value for a request source.
    pub fn get(&self, target: Target) -> &Value {
        match target {
            Target::Body => &self.body,
            Target::Query => &self.query,
            Target::Param => &self.params,
        }
    }

    /// Take the value for a request source, leaving `null` behind.
    pub fn take(&mut self, target: Target) -> Value {
        std::mem::take(self.slot(target))
    }

    /// Replace the value for a request source.
    pub fn set(&mut self, target: Target, value: Value) {
        *self.slot(target) = value;
    }

    fn slot(&mut self, target: Target) -> &mut Value {
        match target {
            Target::Body => &mut self.body,
            Target::Query => &mut self.query,
            Target::Param => &mut self.params,
        }
    }

    /// A single path parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// A single query value.
    pub fn query_value(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Deserialize the body into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        deserialize(&self.body, Target::Body)
    }

    /// Deserialize the query object into `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        deserialize(&self.query, Target::Query)
    }

    /// Deserialize the path parameters into `T`.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        deserialize(&self.params, Target::Param)
    }
}

// Validated data that still fails to deserialize means the handler's type
// disagrees with its bound schema: a server-side defect.
fn deserialize<T: DeserializeOwned>(value: &Value, target: Target) -> Result<T, ApiError> {
    T::deserialize(value)
        .map_err(|e| ApiError::Internal(format!("{target} does not match handler type: {e}")))
}

fn to_json<R: Serialize>(value: R) -> HandlerResult {
    serde_json::to_value(value)
        .map_err(|e| ApiError::Internal(format!("response serialization failed: {e}")))
}

/// Adapt an async function into a [`BoxHandler`].
pub fn handler<F, Fut, R>(f: F) -> BoxHandler
where
    F: Fn(RequestInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    R: Serialize,
{
    Arc::new(move |input| {
        let pending = f(input);
        async move { to_json(pending.await?) }.boxed()
    })
}

/// Adapt a synchronous function into a [`BoxHandler`].
pub fn sync_handler<F, R>(f: F) -> BoxHandler
where
    F: Fn(RequestInput) -> Result<R, ApiError> + Send + Sync + 'static,
    R: Serialize,
{
    Arc::new(move |input| future::ready(f(input).and_then(to_json)).boxed())
}
