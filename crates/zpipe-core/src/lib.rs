//! # zpipe-core — Foundational Types for zpipe
//!
//! This crate defines the vocabulary shared by the schema engine and the
//! HTTP glue layer. It depends on nothing internal.
//!
//! ## Key Types
//!
//! 1. **`Target`.** The part of a request a validator is scoped to: the
//!    JSON body, the query string, or the path parameters.
//!
//! 2. **`Violation` / `Violations`.** A single failed constraint (instance
//!    path + reason) and the non-empty, ordered list of them produced by
//!    one validation pass.
//!
//! 3. **`ValidationError`.** Exactly two kinds. Input failures carry the
//!    full violation list in their message; output failures render a fixed
//!    generic message and keep the details for server-side logs only.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zpipe-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod error;
pub mod target;

pub use error::{ValidationError, Violation, Violations, OUTPUT_FAILURE_MESSAGE};
pub use target::Target;
