//! # Schema Pipes
//!
//! A [`SchemaPipe`] validates one request source. The router hands every
//! source to every pipe of an operation, tagged with where it came from;
//! a pipe only acts on values tagged with its own target and returns all
//! others unchanged.
//!
//! Body values are parsed in strict coercion mode. Query and path values
//! arrive as strings and are parsed leniently, so `"42"` satisfies a
//! number schema.

use std::sync::Arc;

use serde_json::Value;
use zpipe_core::{Target, ValidationError};
use zpipe_schema::{CoercionMode, CompiledSchema, Schema, SchemaError};

use crate::error::ApiError;

/// Metric incremented on every rejected value, labelled by source.
pub const VALIDATION_FAILURES_METRIC: &str = "zpipe_validation_failures_total";

/// Validates the value of one request source against a schema.
#[derive(Debug, Clone)]
pub struct SchemaPipe {
    schema: Arc<CompiledSchema>,
    target: Target,
}

impl SchemaPipe {
    /// Pair an already compiled schema with a target.
    pub fn new(schema: Arc<CompiledSchema>, target: Target) -> Self {
        Self { schema, target }
    }

    /// Compile `schema` and scope it to `target`.
    pub fn compile(schema: Schema, target: Target) -> Result<Self, SchemaError> {
        Ok(Self::new(Arc::new(CompiledSchema::compile(schema)?), target))
    }

    /// A pipe for the JSON body.
    pub fn body(schema: Schema) -> Result<Self, SchemaError> {
        Self::compile(schema, Target::Body)
    }

    /// A pipe for the query string.
    pub fn query(schema: Schema) -> Result<Self, SchemaError> {
        Self::compile(schema, Target::Query)
    }

    /// A pipe for the path parameters.
    pub fn param(schema: Schema) -> Result<Self, SchemaError> {
        Self::compile(schema, Target::Param)
    }

    /// The source this pipe validates.
    pub fn target(&self) -> Target {
        self.target
    }

    /// The compiled schema.
    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Validate `value` if it came from this pipe's target.
    ///
    /// Values from any other source are returned unchanged and unvalidated.
    /// On success the coerced value is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] carrying
    /// [`ValidationError::Input`] with every violated constraint.
    pub fn transform(&self, value: Value, incoming: Target) -> Result<Value, ApiError> {
        if incoming != self.target {
            return Ok(value);
        }

        let mode = if self.target.is_stringly() {
            CoercionMode::Lenient
        } else {
            CoercionMode::Strict
        };

        match self.schema.parse(value, mode) {
            Ok(parsed) => {
                tracing::debug!(source = %self.target, "input validated");
                Ok(parsed)
            }
            Err(violations) => {
                tracing::warn!(
                    source = %self.target,
                    violations = violations.len(),
                    "input validation failed: {violations}"
                );
                metrics::counter!(VALIDATION_FAILURES_METRIC, "target" => self.target.as_str())
                    .increment(1);
                Err(ValidationError::Input {
                    target: self.target,
                    violations,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn id_pipe() -> SchemaPipe {
        SchemaPipe::param(Schema::object([("id", Schema::number())])).unwrap()
    }

    #[test]
    fn test_coerces_path_parameter() {
        let out = id_pipe()
            .transform(json!({ "id": "42" }), Target::Param)
            .unwrap();
        assert_eq!(out, json!({ "id": 42 }));
    }

    #[test]
    fn test_rejects_with_field_path() {
        let err = id_pipe()
            .transform(json!({ "id": "abc" }), Target::Param)
            .unwrap_err();
        match err {
            ApiError::Validation(ValidationError::Input { target, violations }) => {
                assert_eq!(target, Target::Param);
                assert!(violations.mentions("/id"));
            }
            other => panic!("expected input validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_body_is_strict() {
        let pipe = SchemaPipe::body(Schema::object([("n", Schema::number())])).unwrap();
        assert!(pipe.transform(json!({ "n": "1" }), Target::Body).is_err());
        assert_eq!(
            pipe.transform(json!({ "n": 1 }), Target::Body).unwrap(),
            json!({ "n": 1 })
        );
    }

    #[test]
    fn test_mismatched_target_passes_through() {
        let pipe = SchemaPipe::body(Schema::object([("n", Schema::number())])).unwrap();
        let value = json!({ "n": "not a number", "extra": 1 });
        assert_eq!(pipe.transform(value.clone(), Target::Query).unwrap(), value);
    }

    #[test]
    fn test_query_defaults_applied() {
        let pipe = SchemaPipe::query(Schema::object([(
            "limit",
            Schema::integer().default(20),
        )]))
        .unwrap();
        assert_eq!(
            pipe.transform(json!({}), Target::Query).unwrap(),
            json!({ "limit": 20 })
        );
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            ".*".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_other_targets_are_identity(value in arb_json()) {
            let pipe = SchemaPipe::body(Schema::object([("n", Schema::number())])).unwrap();
            prop_assert_eq!(pipe.transform(value.clone(), Target::Query).unwrap(), value.clone());
            prop_assert_eq!(pipe.transform(value.clone(), Target::Param).unwrap(), value);
        }
    }
}
