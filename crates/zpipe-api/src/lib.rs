//! # zpipe-api — Validated Axum Handlers
//!
//! Binds [`zpipe_schema::Schema`]s to axum handlers so that request data is
//! validated before a handler runs, a handler's result is validated before
//! it is sent, and the OpenAPI document is generated from the same
//! schemas.
//!
//! ## Request Flow
//!
//! ```text
//! path / query / body ──► SchemaPipe (per target) ──► handler ──► returns check ──► JSON
//!                              │                                      │
//!                              └── 400, detailed violations           └── 400, "Validation failed"
//! ```
//!
//! Every pipe sees every request source but acts only on its own target;
//! other sources pass through unchanged.
//!
//! ## Usage
//!
//! ```ignore
//! use zpipe_api::{params, returns, sync_handler, ApiConfig, ApiRouter};
//! use zpipe_schema::Schema;
//!
//! let api = ApiRouter::new(ApiConfig::default()).get(
//!     "/users/{id}",
//!     sync_handler(|input| Ok::<_, zpipe_api::ApiError>(input.params)),
//!     [
//!         params(Schema::object([("id", Schema::number())]))?,
//!         returns(Schema::object([("id", Schema::number())]))?,
//!     ],
//! );
//! let app: axum::Router = api.into_router();
//! ```
//!
//! ## Observability
//!
//! Validation outcomes are logged through `tracing` and counted in the
//! `zpipe_validation_failures_total` metric. HTTP spans come from
//! `tower_http::trace::TraceLayer`.

pub mod config;
pub mod demo;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod openapi;
pub mod operation;
pub mod pipe;
pub mod router;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ValidationErrorBody};
pub use handler::{handler, sync_handler, BoxHandler, HandlerResult, RequestInput};
pub use operation::{
    body, intercept, params, query, returns, returns_with_status, Binding, HandlerOperation,
};
pub use pipe::SchemaPipe;
pub use router::ApiRouter;
