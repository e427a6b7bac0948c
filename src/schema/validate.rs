//! Minimal shape validation used when inserting objects into the shadow
//! store (spec §4.D: `Insert` "validates the object against the class's
//! schema") and when decoding HTTP responses (spec §4.F step 7).
//!
//! This is intentionally shallower than full JSON Schema validation: it
//! checks type compatibility and presence of required properties, which is
//! what the shadow store and response validator need. It does not enforce
//! `pattern`, `minimum`/`maximum`, or `enum` — those are generation-time
//! concerns (component B), not storage-time ones.

use serde_json::Value;

use super::model::{SchemaNode, SchemaType};

/// Checks that `value` has the shape `schema` describes. Returns an error
/// message describing the first mismatch found.
pub fn validate(schema: &SchemaNode, value: &Value) -> Result<(), String> {
    let Some(type_) = schema.type_ else {
        // An untyped schema (e.g. a bare `$ref` target that wasn't
        // resolved by the caller) accepts anything.
        return Ok(());
    };

    match type_ {
        SchemaType::Object => {
            let Value::Object(map) = value else {
                return Err(format!("expected object, got {value}"));
            };
            for field in &schema.required {
                if !map.contains_key(field) {
                    return Err(format!("missing required property {field:?}"));
                }
            }
            for (name, property_schema) in &schema.properties {
                if let Some(property_value) = map.get(name) {
                    validate(property_schema, property_value)
                        .map_err(|inner| format!("property {name:?}: {inner}"))?;
                }
            }
            Ok(())
        }
        SchemaType::Array => {
            let Value::Array(items) = value else {
                return Err(format!("expected array, got {value}"));
            };
            if let Some(item_schema) = schema.items.as_ref().and_then(|i| i.schema_for_generation())
            {
                for (index, item) in items.iter().enumerate() {
                    validate(item_schema, item)
                        .map_err(|inner| format!("item {index}: {inner}"))?;
                }
            }
            Ok(())
        }
        SchemaType::String => {
            if value.is_string() {
                Ok(())
            } else {
                Err(format!("expected string, got {value}"))
            }
        }
        SchemaType::Boolean => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(format!("expected boolean, got {value}"))
            }
        }
        SchemaType::Integer => {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err(format!("expected integer, got {value}"))
            }
        }
        SchemaType::Number => {
            if value.is_number() {
                Ok(())
            } else {
                Err(format!("expected number, got {value}"))
            }
        }
    }
}
