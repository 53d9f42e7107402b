//! # Schema Validation
//!
//! Runtime parsing of JSON values against a [`Schema`].
//!
//! ## Pipeline
//!
//! 1. **Coerce** the input toward the schema (defaults, stripping,
//!    string → scalar conversion). See [`crate::coerce`].
//! 2. **Validate** the coerced value with a `jsonschema::Validator`
//!    compiled once from [`Schema::to_json_schema`]. Every error is kept,
//!    with its instance path.
//! 3. **Refine**: when structural validation passed, run each custom
//!    refinement at its location in the value.
//!
//! A successful parse returns the coerced value, so a schema doubles as a
//! response-shaping step and not just a check.
//!
//! ## Thread Safety
//!
//! `CompiledSchema` is `Send + Sync`. Compilation happens once; parsing
//! takes `&self` and allocates only per call.

use std::fmt;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;
use zpipe_core::{Violation, Violations};

use crate::coerce::{coerce, CoercionMode};
use crate::schema::{Schema, SchemaKind};

/// Error raised while preparing a schema for use.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The rendered JSON Schema could not be compiled (e.g. an invalid `pattern`).
    #[error("schema compile error: {reason}")]
    Compile {
        /// Reason reported by the validator builder.
        reason: String,
    },
}

/// A schema paired with its compiled runtime validator.
pub struct CompiledSchema {
    schema: Schema,
    json_schema: Value,
    validator: Validator,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("json_schema", &self.json_schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile `schema` into a reusable validator.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Compile`] if the rendered JSON Schema is
    /// rejected by the validator builder.
    pub fn compile(schema: Schema) -> Result<Self, SchemaError> {
        let json_schema = schema.to_json_schema();
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&json_schema)
            .map_err(|e| SchemaError::Compile {
                reason: e.to_string(),
            })?;
        tracing::debug!(schema = %json_schema, "compiled schema");
        Ok(Self {
            schema,
            json_schema,
            validator,
        })
    }

    /// The source schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The rendered JSON Schema the validator was compiled from.
    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    /// Parse `value`, returning the coerced value or every violation.
    ///
    /// A `null` input for an optional schema is treated as absent and
    /// yields the schema's default, or `null` when there is none.
    pub fn parse(&self, value: Value, mode: CoercionMode) -> Result<Value, Violations> {
        if value.is_null() && self.schema.allows_missing() && !self.schema.allows_null() {
            return Ok(self.schema.default_value().cloned().unwrap_or(Value::Null));
        }

        let coerced = coerce(&self.schema, value, mode);

        let mut violations: Vec<Violation> = self
            .validator
            .iter_errors(&coerced)
            .map(|e| Violation::new(e.instance_path.to_string(), e.to_string()))
            .collect();

        if violations.is_empty() {
            refine(&self.schema, &coerced, String::new(), &mut violations);
        }

        match Violations::from_vec(violations) {
            None => Ok(coerced),
            Some(violations) => Err(violations),
        }
    }

    /// Returns true if `value` parses cleanly.
    pub fn is_valid(&self, value: &Value, mode: CoercionMode) -> bool {
        self.parse(value.clone(), mode).is_ok()
    }
}

/// Run refinements depth-first, children before parents.
fn refine(schema: &Schema, value: &Value, path: String, out: &mut Vec<Violation>) {
    if value.is_null() {
        return;
    }
    match (schema.kind(), value) {
        (SchemaKind::Object { fields, .. }, Value::Object(map)) => {
            for (name, field) in fields {
                if let Some(v) = map.get(name) {
                    refine(field, v, format!("{path}/{}", escape_pointer(name)), out);
                }
            }
        }
        (SchemaKind::Array { items, .. }, Value::Array(elements)) => {
            for (i, v) in elements.iter().enumerate() {
                refine(items, v, format!("{path}/{i}"), out);
            }
        }
        _ => {}
    }
    for refinement in schema.refinements() {
        if !refinement.check(value) {
            out.push(Violation::new(path.clone(), refinement.message()));
        }
    }
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
