//! # Schema Model
//!
//! A `Schema` is an immutable description of an expected JSON value:
//! its kind, constraints, optionality, nullability, default, and any
//! custom refinements. Schemas are built from constructor functions and
//! chained modifiers:
//!
//! ```
//! use zpipe_schema::Schema;
//!
//! let user = Schema::object([
//!     ("id", Schema::integer().min(1.0)),
//!     ("name", Schema::string().min_length(1)),
//!     ("nickname", Schema::string().optional()),
//!     ("manager_id", Schema::integer().nullable()),
//! ]);
//! ```
//!
//! Constraint modifiers that do not apply to a schema's kind (for example
//! `min_length` on a number) are ignored.
//!
//! ## Runtime JSON Schema
//!
//! [`Schema::to_json_schema`] renders the Draft 2020-12 document used by
//! the runtime validator. Nullable schemas render as
//! `anyOf: [<schema>, {"type": "null"}]`; optional and defaulted object
//! fields are left out of `required`.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

/// Kind-specific constraints for strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    /// Minimum length in characters.
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    pub max_length: Option<usize>,
    /// ECMA 262 regular expression the value must match.
    pub pattern: Option<String>,
    /// Format hint (`uuid`, `email`, `date-time`, ...). Documentation only.
    pub format: Option<String>,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumberRules {
    /// Inclusive lower bound.
    pub min: Option<f64>,
    /// Inclusive upper bound.
    pub max: Option<f64>,
}

/// The structural kind of a schema.
#[derive(Debug, Clone)]
pub enum SchemaKind {
    /// A UTF-8 string.
    String(StringRules),
    /// Any JSON number.
    Number(NumberRules),
    /// A JSON number without a fractional part.
    Integer(NumberRules),
    /// `true` or `false`.
    Boolean,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    /// Exactly this value.
    Literal(Value),
    /// A homogeneous array.
    Array {
        /// Schema every element must match.
        items: Box<Schema>,
        /// Minimum number of elements.
        min_items: Option<usize>,
        /// Maximum number of elements.
        max_items: Option<usize>,
    },
    /// An object with named fields, in declaration order.
    Object {
        /// Field name and schema pairs.
        fields: Vec<(String, Schema)>,
        /// Reject unknown keys instead of stripping them.
        strict: bool,
    },
    /// Accepts any value.
    Any,
}

/// A custom check run after structural validation succeeds.
#[derive(Clone)]
pub struct Refinement {
    message: String,
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Refinement {
    /// Message reported when the check fails.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run the check against a value.
    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// A declarative description of an expected value.
#[derive(Debug, Clone)]
pub struct Schema {
    kind: SchemaKind,
    optional: bool,
    nullable: bool,
    default: Option<Value>,
    coerce: bool,
    description: Option<String>,
    refinements: Vec<Refinement>,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            default: None,
            coerce: false,
            description: None,
            refinements: Vec::new(),
        }
    }

    /// A string schema.
    pub fn string() -> Self {
        Self::of(SchemaKind::String(StringRules::default()))
    }

    /// A number schema.
    pub fn number() -> Self {
        Self::of(SchemaKind::Number(NumberRules::default()))
    }

    /// An integer schema.
    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer(NumberRules::default()))
    }

    /// A boolean schema.
    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    /// A string restricted to one of `values`.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// Exactly `value`.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::of(SchemaKind::Literal(value.into()))
    }

    /// An array whose elements match `items`.
    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// An object with the given fields. Unknown keys are stripped on parse.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::of(SchemaKind::Object {
            fields: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            strict: false,
        })
    }

    /// A schema accepting any value.
    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    // -- Modifiers -----------------------------------------------------------

    /// Allow the value to be absent.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Allow `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Substitute `value` when absent. A defaulted schema counts as optional.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Coerce string input into this scalar kind regardless of source.
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Attach a description for documentation.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Add a custom check run after structural validation succeeds.
    pub fn refine<F>(mut self, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.refinements.push(Refinement {
            message: message.into(),
            check: Arc::new(check),
        });
        self
    }

    /// Minimum string length.
    pub fn min_length(mut self, n: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.min_length = Some(n);
        }
        self
    }

    /// Maximum string length.
    pub fn max_length(mut self, n: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.max_length = Some(n);
        }
        self
    }

    /// Regular expression a string must match.
    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.pattern = Some(regex.into());
        }
        self
    }

    /// String format hint.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.format = Some(format.into());
        }
        self
    }

    /// Inclusive numeric lower bound.
    pub fn min(mut self, n: f64) -> Self {
        if let SchemaKind::Number(rules) | SchemaKind::Integer(rules) = &mut self.kind {
            rules.min = Some(n);
        }
        self
    }

    /// Inclusive numeric upper bound.
    pub fn max(mut self, n: f64) -> Self {
        if let SchemaKind::Number(rules) | SchemaKind::Integer(rules) = &mut self.kind {
            rules.max = Some(n);
        }
        self
    }

    /// Minimum array length.
    pub fn min_items(mut self, n: usize) -> Self {
        if let SchemaKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(n);
        }
        self
    }

    /// Maximum array length.
    pub fn max_items(mut self, n: usize) -> Self {
        if let SchemaKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(n);
        }
        self
    }

    /// Reject unknown object keys instead of stripping them.
    pub fn strict(mut self) -> Self {
        if let SchemaKind::Object { strict, .. } = &mut self.kind {
            *strict = true;
        }
        self
    }

    // -- Accessors -----------------------------------------------------------

    /// The structural kind.
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Whether the value may be absent (explicitly optional or defaulted).
    pub fn allows_missing(&self) -> bool {
        self.optional || self.default.is_some()
    }

    /// Whether `null` is accepted.
    pub fn allows_null(&self) -> bool {
        self.nullable
    }

    /// The default substituted for an absent value.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether string input is coerced on every source.
    pub fn coerces(&self) -> bool {
        self.coerce
    }

    /// The documentation description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Custom checks in registration order.
    pub fn refinements(&self) -> &[Refinement] {
        &self.refinements
    }

    /// Whether this schema describes an object.
    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }

    /// Look up an object field by name.
    pub fn field(&self, name: &str) -> Option<&Schema> {
        match &self.kind {
            SchemaKind::Object { fields, .. } => {
                fields.iter().find(|(k, _)| k == name).map(|(_, s)| s)
            }
            _ => None,
        }
    }

    /// Render the runtime JSON Schema (Draft 2020-12).
    pub fn to_json_schema(&self) -> Value {
        let mut doc = match &self.kind {
            SchemaKind::String(rules) => {
                let mut m = type_map("string");
                insert_opt(&mut m, "minLength", rules.min_length.map(Value::from));
                insert_opt(&mut m, "maxLength", rules.max_length.map(Value::from));
                insert_opt(&mut m, "pattern", rules.pattern.clone().map(Value::from));
                insert_opt(&mut m, "format", rules.format.clone().map(Value::from));
                m
            }
            SchemaKind::Number(rules) => number_map("number", rules),
            SchemaKind::Integer(rules) => number_map("integer", rules),
            SchemaKind::Boolean => type_map("boolean"),
            SchemaKind::Enum(values) => {
                let mut m = type_map("string");
                m.insert("enum".into(), json!(values));
                m
            }
            SchemaKind::Literal(value) => {
                let mut m = Map::new();
                m.insert("const".into(), value.clone());
                m
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut m = type_map("array");
                m.insert("items".into(), items.to_json_schema());
                insert_opt(&mut m, "minItems", min_items.map(Value::from));
                insert_opt(&mut m, "maxItems", max_items.map(Value::from));
                m
            }
            SchemaKind::Object { fields, strict } => {
                let mut m = type_map("object");
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (name, field) in fields {
                    properties.insert(name.clone(), field.to_json_schema());
                    if !field.allows_missing() {
                        required.push(Value::from(name.as_str()));
                    }
                }
                m.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    m.insert("required".into(), Value::Array(required));
                }
                if *strict {
                    m.insert("additionalProperties".into(), Value::Bool(false));
                }
                m
            }
            SchemaKind::Any => Map::new(),
        };

        if self.nullable {
            let inner = Value::Object(doc);
            doc = Map::new();
            doc.insert("anyOf".into(), json!([inner, { "type": "null" }]));
        }
        insert_opt(&mut doc, "description", self.description.clone().map(Value::from));
        insert_opt(&mut doc, "default", self.default.clone());
        Value::Object(doc)
    }
}

fn type_map(ty: &str) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("type".into(), Value::from(ty));
    m
}

fn number_map(ty: &str, rules: &NumberRules) -> Map<String, Value> {
    let mut m = type_map(ty);
    insert_opt(&mut m, "minimum", rules.min.map(Value::from));
    insert_opt(&mut m, "maximum", rules.max.map(Value::from));
    m
}

fn insert_opt(m: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        m.insert(key.to_string(), v);
    }
}

/// Typed access to an object schema's fields.
///
/// Documentation reconciliation and query/param binding go through this
/// trait instead of reaching into schema internals. Non-object schemas
/// list no properties and answer `false` for every field.
pub trait ShapeAccess {
    /// Field names in declaration order.
    fn list_properties(&self) -> Vec<&str>;
    /// Whether the named field may be absent.
    fn is_optional(&self, field: &str) -> bool;
    /// Whether the named field accepts `null`.
    fn is_nullable(&self, field: &str) -> bool;
}

impl ShapeAccess for Schema {
    fn list_properties(&self) -> Vec<&str> {
        match &self.kind {
            SchemaKind::Object { fields, .. } => fields.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    fn is_optional(&self, field: &str) -> bool {
        self.field(field).is_some_and(Schema::allows_missing)
    }

    fn is_nullable(&self, field: &str) -> bool {
        self.field(field).is_some_and(Schema::allows_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Schema {
        Schema::object([
            ("a", Schema::string()),
            ("b", Schema::string().optional()),
            ("c", Schema::string().nullable()),
        ])
    }

    #[test]
    fn test_shape_access() {
        let s = abc();
        assert_eq!(s.list_properties(), vec!["a", "b", "c"]);
        assert!(!s.is_optional("a"));
        assert!(s.is_optional("b"));
        assert!(s.is_nullable("c"));
        assert!(!s.is_nullable("missing"));
    }

    #[test]
    fn test_non_object_lists_no_properties() {
        assert!(Schema::string().list_properties().is_empty());
        assert!(!Schema::string().is_optional("a"));
    }

    #[test]
    fn test_default_counts_as_optional() {
        let s = Schema::integer().default(10);
        assert!(s.allows_missing());
        assert_eq!(s.default_value(), Some(&json!(10)));
    }

    #[test]
    fn test_inapplicable_constraints_ignored() {
        let s = Schema::number().min_length(3).pattern("x");
        assert_eq!(s.to_json_schema(), json!({ "type": "number" }));
    }

    #[test]
    fn test_object_json_schema_required() {
        let doc = abc().to_json_schema();
        assert_eq!(doc["type"], "object");
        assert_eq!(doc["required"], json!(["a", "c"]));
        assert!(doc.get("additionalProperties").is_none());
    }

    #[test]
    fn test_strict_object_rejects_additional() {
        let doc = abc().strict().to_json_schema();
        assert_eq!(doc["additionalProperties"], json!(false));
    }

    #[test]
    fn test_nullable_renders_any_of() {
        let doc = Schema::string().min_length(2).nullable().to_json_schema();
        assert_eq!(
            doc,
            json!({ "anyOf": [{ "type": "string", "minLength": 2 }, { "type": "null" }] })
        );
    }

    #[test]
    fn test_annotations_rendered() {
        let doc = Schema::integer()
            .min(1.0)
            .max(100.0)
            .default(20)
            .describe("page size")
            .to_json_schema();
        assert_eq!(doc["minimum"], json!(1.0));
        assert_eq!(doc["maximum"], json!(100.0));
        assert_eq!(doc["default"], json!(20));
        assert_eq!(doc["description"], "page size");
    }

    #[test]
    fn test_refinement_debug_hides_closure() {
        let s = Schema::string().refine("must be lowercase", |v| {
            v.as_str().is_some_and(|s| s == s.to_lowercase())
        });
        let r = &s.refinements()[0];
        assert_eq!(r.message(), "must be lowercase");
        assert!(r.check(&json!("abc")));
        assert!(!r.check(&json!("ABC")));
        assert!(format!("{r:?}").contains("must be lowercase"));
    }
}
