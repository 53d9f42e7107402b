//! # Coercion
//!
//! Rewrites an input value toward the shape a schema describes before
//! structural validation runs:
//!
//! - Missing object fields with a default receive it.
//! - Unknown keys are dropped from non-strict objects.
//! - String scalars are converted into numbers, integers, and booleans
//!   when the schema asks for it (`coerce()`) or when the value came from
//!   a string-only source (`CoercionMode::Lenient`).
//! - In lenient mode a lone scalar bound to an array schema becomes a
//!   one-element array (`?tag=a` against `tag: string[]`).
//!
//! Coercion never fails. A string that cannot be converted is left as-is
//! so the validator reports it against the original input.

use serde_json::{Map, Number, Value};

use crate::schema::{Schema, SchemaKind};

/// How aggressively string input is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionMode {
    /// Convert only schemas marked `coerce()`. Used for JSON bodies.
    Strict,
    /// Convert every scalar. Used for query strings and path parameters.
    Lenient,
}

/// Coerce `value` toward `schema`.
pub fn coerce(schema: &Schema, value: Value, mode: CoercionMode) -> Value {
    if value.is_null() {
        return value;
    }
    let convert = schema.coerces() || mode == CoercionMode::Lenient;

    match schema.kind() {
        SchemaKind::Object { fields, strict } => match value {
            Value::Object(mut input) => {
                let mut out = Map::new();
                for (name, field) in fields {
                    match input.remove(name) {
                        Some(v) => {
                            out.insert(name.clone(), coerce(field, v, mode));
                        }
                        None => {
                            if let Some(default) = field.default_value() {
                                out.insert(name.clone(), default.clone());
                            }
                        }
                    }
                }
                if *strict {
                    out.extend(input);
                }
                Value::Object(out)
            }
            other => other,
        },
        SchemaKind::Array { items, .. } => match value {
            Value::Array(elements) => Value::Array(
                elements
                    .into_iter()
                    .map(|v| coerce(items, v, mode))
                    .collect(),
            ),
            scalar if mode == CoercionMode::Lenient && is_scalar(&scalar) => {
                Value::Array(vec![coerce(items, scalar, mode)])
            }
            other => other,
        },
        SchemaKind::Number(_) if convert => match value {
            Value::String(s) => parse_number(&s).unwrap_or(Value::String(s)),
            other => other,
        },
        SchemaKind::Integer(_) if convert => match value {
            Value::String(s) => parse_integer(&s).unwrap_or(Value::String(s)),
            other => other,
        },
        SchemaKind::Boolean if convert => match value {
            Value::String(s) => parse_bool(&s).unwrap_or(Value::String(s)),
            other => other,
        },
        SchemaKind::String(_) if schema.coerces() => match value {
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => other,
        },
        _ => value,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_integer(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    // "3.0" is an integer in JSON Schema terms; "3.5" is left for the validator.
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Some(Value::from(f as i64))
        }
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<Value> {
    match s {
        "true" | "1" => Some(Value::Bool(true)),
        "false" | "0" => Some(Value::Bool(false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_numeric_string() {
        let s = Schema::object([("id", Schema::number())]);
        let out = coerce(&s, json!({ "id": "42" }), CoercionMode::Lenient);
        assert_eq!(out, json!({ "id": 42 }));
    }

    #[test]
    fn test_lenient_float_string() {
        let out = coerce(&Schema::number(), json!("4.5"), CoercionMode::Lenient);
        assert_eq!(out, json!(4.5));
    }

    #[test]
    fn test_uncoercible_left_unchanged() {
        let s = Schema::object([("id", Schema::number())]);
        let out = coerce(&s, json!({ "id": "abc" }), CoercionMode::Lenient);
        assert_eq!(out, json!({ "id": "abc" }));
    }

    #[test]
    fn test_strict_mode_leaves_strings() {
        let s = Schema::object([("id", Schema::number())]);
        let out = coerce(&s, json!({ "id": "42" }), CoercionMode::Strict);
        assert_eq!(out, json!({ "id": "42" }));
    }

    #[test]
    fn test_explicit_coerce_in_strict_mode() {
        let s = Schema::object([("id", Schema::integer().coerce())]);
        let out = coerce(&s, json!({ "id": "7" }), CoercionMode::Strict);
        assert_eq!(out, json!({ "id": 7 }));
    }

    #[test]
    fn test_integer_from_whole_float_string() {
        assert_eq!(
            coerce(&Schema::integer(), json!("3.0"), CoercionMode::Lenient),
            json!(3)
        );
        assert_eq!(
            coerce(&Schema::integer(), json!("3.5"), CoercionMode::Lenient),
            json!("3.5")
        );
    }

    #[test]
    fn test_boolean_strings() {
        let b = Schema::boolean();
        assert_eq!(coerce(&b, json!("true"), CoercionMode::Lenient), json!(true));
        assert_eq!(coerce(&b, json!("0"), CoercionMode::Lenient), json!(false));
        assert_eq!(coerce(&b, json!("yes"), CoercionMode::Lenient), json!("yes"));
    }

    #[test]
    fn test_string_coerce_from_number() {
        let s = Schema::string().coerce();
        assert_eq!(coerce(&s, json!(12), CoercionMode::Strict), json!("12"));
    }

    #[test]
    fn test_defaults_filled() {
        let s = Schema::object([
            ("page", Schema::integer().default(1)),
            ("q", Schema::string().optional()),
        ]);
        let out = coerce(&s, json!({}), CoercionMode::Lenient);
        assert_eq!(out, json!({ "page": 1 }));
    }

    #[test]
    fn test_unknown_keys_stripped_unless_strict() {
        let fields = [("a", Schema::string())];
        let loose = Schema::object(fields.clone());
        let strict = Schema::object(fields).strict();
        let input = json!({ "a": "x", "extra": true });
        assert_eq!(
            coerce(&loose, input.clone(), CoercionMode::Strict),
            json!({ "a": "x" })
        );
        assert_eq!(coerce(&strict, input.clone(), CoercionMode::Strict), input);
    }

    #[test]
    fn test_lone_scalar_wrapped_for_array() {
        let s = Schema::object([("tag", Schema::array(Schema::integer()))]);
        let out = coerce(&s, json!({ "tag": "5" }), CoercionMode::Lenient);
        assert_eq!(out, json!({ "tag": [5] }));
        let out = coerce(&s, json!({ "tag": ["1", "2"] }), CoercionMode::Lenient);
        assert_eq!(out, json!({ "tag": [1, 2] }));
    }

    #[test]
    fn test_null_passes_through() {
        let s = Schema::number().nullable();
        assert_eq!(coerce(&s, Value::Null, CoercionMode::Lenient), Value::Null);
    }

    #[test]
    fn test_non_object_input_untouched() {
        let s = Schema::object([("a", Schema::string())]);
        assert_eq!(coerce(&s, json!([1, 2]), CoercionMode::Strict), json!([1, 2]));
    }
}
