//! # Documentation Generation
//!
//! Derives OpenAPI schema objects (`utoipa::openapi::schema::Schema`) from
//! a [`Schema`]. The result is documentation only: it is never consulted
//! while validating a request.
//!
//! ## Required-field reconciliation
//!
//! [`convert`] documents a field carrying a refinement but leaves it out
//! of its object's `required` list, because a refined field is rendered
//! from its inner schema without the presence information. [`generate`]
//! closes that gap with [`reconcile_required`]: every property not yet
//! required is added unless the source schema marks it optional or
//! nullable. Every object is reconciled, nested properties and array
//! items included. The pass only adds entries, so the documented required list
//! never under-reports the schema.

use utoipa::openapi::schema::{
    AdditionalProperties, Array, Object, ObjectBuilder, Schema as DocSchema, SchemaFormat,
    SchemaType, Type,
};
use serde_json::Value;
use utoipa::openapi::RefOr;

use crate::schema::{Schema, SchemaKind, ShapeAccess};

/// A documented object property, as attached to query or path parameters.
#[derive(Debug, Clone)]
pub struct PropertyDoc {
    /// Property name.
    pub name: String,
    /// Converted property schema.
    pub schema: RefOr<DocSchema>,
    /// Whether the property appears in the reconciled required list.
    pub required: bool,
}

/// Convert a schema into its OpenAPI documentation form.
pub fn convert(schema: &Schema) -> DocSchema {
    render(schema, false)
}

fn render(schema: &Schema, reconcile: bool) -> DocSchema {
    match schema.kind() {
        SchemaKind::Array {
            items,
            min_items,
            max_items,
        } => {
            let mut array = Array::new(render(items, reconcile));
            if schema.allows_null() {
                array.schema_type = SchemaType::from_iter([Type::Array, Type::Null]);
            }
            array.min_items = *min_items;
            array.max_items = *max_items;
            array.description = schema.description().map(str::to_string);
            array.default = schema.default_value().cloned();
            DocSchema::Array(array)
        }
        _ => {
            let mut object = convert_object(schema, reconcile);
            if reconcile {
                reconcile_required(&mut object, schema);
            }
            DocSchema::Object(object)
        }
    }
}

fn schema_type(ty: Type, nullable: bool) -> SchemaType {
    if nullable {
        SchemaType::from_iter([ty, Type::Null])
    } else {
        SchemaType::Type(ty)
    }
}

fn literal_type(value: &Value, nullable: bool) -> SchemaType {
    let ty = match value {
        Value::Null => return SchemaType::Type(Type::Null),
        Value::Bool(_) => Type::Boolean,
        Value::Number(n) if n.is_f64() => Type::Number,
        Value::Number(_) => Type::Integer,
        Value::String(_) => Type::String,
        Value::Array(_) => Type::Array,
        Value::Object(_) => Type::Object,
    };
    schema_type(ty, nullable)
}

fn convert_object(schema: &Schema, reconcile: bool) -> Object {
    let nullable = schema.allows_null();
    let builder = ObjectBuilder::new()
        .description(schema.description())
        .default(schema.default_value().cloned());

    let builder = match schema.kind() {
        SchemaKind::String(rules) => builder
            .schema_type(schema_type(Type::String, nullable))
            .min_length(rules.min_length)
            .max_length(rules.max_length)
            .pattern(rules.pattern.clone())
            .format(rules.format.clone().map(SchemaFormat::Custom)),
        SchemaKind::Number(rules) => builder
            .schema_type(schema_type(Type::Number, nullable))
            .minimum(rules.min)
            .maximum(rules.max),
        SchemaKind::Integer(rules) => builder
            .schema_type(schema_type(Type::Integer, nullable))
            .minimum(rules.min)
            .maximum(rules.max),
        SchemaKind::Boolean => builder.schema_type(schema_type(Type::Boolean, nullable)),
        SchemaKind::Enum(values) => builder
            .schema_type(schema_type(Type::String, nullable))
            .enum_values(Some(values.clone())),
        SchemaKind::Literal(value) => builder
            .schema_type(literal_type(value, nullable))
            .enum_values(Some(vec![value.clone()])),
        SchemaKind::Object { fields, strict } => {
            let mut b = builder.schema_type(schema_type(Type::Object, nullable));
            for (name, field) in fields {
                b = b.property(name.as_str(), render(field, reconcile));
                if !field.allows_missing()
                    && !field.allows_null()
                    && field.refinements().is_empty()
                {
                    b = b.required(name.as_str());
                }
            }
            if *strict {
                b = b.additional_properties(Some(AdditionalProperties::<DocSchema>::FreeForm(
                    false,
                )));
            }
            b
        }
        // Arrays are rendered by `render`.
        SchemaKind::Any | SchemaKind::Array { .. } => builder.schema_type(SchemaType::AnyValue),
    };
    builder.build()
}

/// Add every property missing from `object.required` unless `source`
/// marks it optional or nullable. Existing entries are kept.
pub fn reconcile_required(object: &mut Object, source: &impl ShapeAccess) {
    for property in source.list_properties() {
        if !object.properties.contains_key(property) {
            continue;
        }
        if object.required.iter().any(|r| r == property) {
            continue;
        }
        if source.is_optional(property) || source.is_nullable(property) {
            continue;
        }
        object.required.push(property.to_string());
    }
}

/// Convert `schema`, reconciling the required list of every object in
/// it: nested properties and array items included.
pub fn generate(schema: &Schema) -> DocSchema {
    render(schema, true)
}

/// Per-property documentation for a flat object schema.
///
/// Returns `None` when the generated fragment has no properties (a
/// non-object schema): such schemas produce no per-field documentation.
pub fn properties_of(schema: &Schema) -> Option<Vec<PropertyDoc>> {
    if !schema.is_object() {
        return None;
    }
    let DocSchema::Object(object) = generate(schema) else {
        return None;
    };
    let Object {
        mut properties,
        required,
        ..
    } = object;
    Some(
        schema
            .list_properties()
            .into_iter()
            .filter_map(|name| {
                properties.remove(name).map(|doc| PropertyDoc {
                    name: name.to_string(),
                    schema: doc,
                    required: required.iter().any(|r| r == name),
                })
            })
            .collect(),
    )
}
