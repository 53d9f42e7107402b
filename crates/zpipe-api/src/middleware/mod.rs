//! # Middleware Modules
//!
//! Tower middleware layers wrapped around every zpipe router.

pub mod metrics;
pub mod tracing_layer;
