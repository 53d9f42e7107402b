//! # zpipe-schema — Schema Engine & Documentation Generation
//!
//! Provides the declarative [`Schema`] model used to validate request and
//! response data, and the generator that turns the same schema into
//! OpenAPI documentation.
//!
//! ## Runtime Validation (`validate`)
//!
//! [`CompiledSchema::parse`] coerces an input toward the schema, validates
//! it against a `jsonschema` validator compiled once from the schema's
//! JSON Schema rendering, then runs custom refinements. Failures carry
//! every violated constraint with its instance path.
//!
//! ## Documentation (`docgen`)
//!
//! [`docgen::generate`] converts a schema into a `utoipa` schema object
//! and reconciles its `required` list against the schema's own
//! optionality, so documentation never under-reports required fields.
//!
//! ## Crate Policy
//!
//! - Depends only on `zpipe-core` internally.
//! - Object introspection goes through [`ShapeAccess`]; nothing outside
//!   this crate matches on schema internals to decide optionality.

pub mod coerce;
pub mod docgen;
pub mod schema;
pub mod validate;

pub use coerce::CoercionMode;
pub use docgen::{generate, properties_of, reconcile_required, PropertyDoc};
pub use schema::{NumberRules, Refinement, Schema, SchemaKind, ShapeAccess, StringRules};
pub use validate::{CompiledSchema, SchemaError};
