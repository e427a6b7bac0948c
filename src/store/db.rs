//! The shadow object store (component D): an in-memory, per-class model of
//! server state used to verify that what the server returns matches what
//! the engine believes exists.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{MeqaError, Result};
use crate::schema::model::SchemaNode;
use crate::schema::validate;

/// How [`ShadowStore::find`] (and friends) match stored objects against a
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFn {
    /// Matches any stored object.
    MatchAlways,
    /// Matches when every field present in the key equals the stored
    /// object's field.
    MatchAllFields,
}

fn matches(match_fn: MatchFn, key: &Value, object: &Value) -> bool {
    match match_fn {
        MatchFn::MatchAlways => true,
        MatchFn::MatchAllFields => {
            let (Some(key_map), Some(object_map)) = (key.as_object(), object.as_object()) else {
                return false;
            };
            key_map
                .iter()
                .all(|(field, value)| object_map.get(field) == Some(value))
        }
    }
}

/// An in-memory, process-wide `Class -> ordered sequence of objects`
/// mapping, with the `Find`/`Insert`/`Update`/`Delete` contract from
/// spec §4.D.
#[derive(Debug, Clone, Default)]
pub struct ShadowStore {
    classes: IndexMap<String, Vec<Value>>,
}

impl ShadowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns up to `limit` objects of `class` matching `key` under
    /// `match_fn`. A negative `limit` means unbounded.
    pub fn find(&self, class: &str, key: &Value, match_fn: MatchFn, limit: i64) -> Vec<Value> {
        let Some(objects) = self.classes.get(class) else {
            return Vec::new();
        };
        let mut results = Vec::new();
        for object in objects {
            if matches(match_fn, key, object) {
                results.push(object.clone());
                if limit >= 0 && results.len() as i64 >= limit {
                    break;
                }
            }
        }
        results
    }

    /// Validates `object` against `schema`, then appends it to `class`'s
    /// sequence.
    pub fn insert(&mut self, class: &str, schema: &SchemaNode, object: Value) -> Result<()> {
        validate::validate(schema, &object).map_err(|message| MeqaError::Invalid {
            message: format!("object does not validate against schema for {class}: {message}"),
        })?;
        self.classes
            .entry(class.to_string())
            .or_default()
            .push(object);
        Ok(())
    }

    /// Updates up to `limit` objects of `class` matching `key`: replaces
    /// the object entirely when `merge` is `false` (PUT semantics), or
    /// field-merges `patch` into the existing object when `merge` is
    /// `true` (PATCH semantics). Returns the number of objects touched.
    pub fn update(
        &mut self,
        class: &str,
        key: &Value,
        match_fn: MatchFn,
        patch: &Value,
        limit: i64,
        merge: bool,
    ) -> usize {
        let Some(objects) = self.classes.get_mut(class) else {
            return 0;
        };
        let mut touched = 0;
        for object in objects.iter_mut() {
            if !matches(match_fn, key, object) {
                continue;
            }
            if merge {
                if let (Some(object_map), Some(patch_map)) =
                    (object.as_object_mut(), patch.as_object())
                {
                    for (field, value) in patch_map {
                        object_map.insert(field.clone(), value.clone());
                    }
                }
            } else {
                *object = patch.clone();
            }
            touched += 1;
            if limit >= 0 && touched as i64 >= limit {
                break;
            }
        }
        touched
    }

    /// Removes up to `limit` objects of `class` matching `key` in place.
    pub fn delete(&mut self, class: &str, key: &Value, match_fn: MatchFn, limit: i64) -> usize {
        let Some(objects) = self.classes.get_mut(class) else {
            return 0;
        };
        let mut removed = 0;
        objects.retain(|object| {
            if (limit < 0 || removed < limit as usize) && matches(match_fn, key, object) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Returns up to `limit` stored objects of `class`, in insertion order.
    /// Used by the value generator's cross-test dataflow heuristic (spec
    /// §4.B).
    pub fn sample(&self, class: &str, limit: usize) -> Vec<Value> {
        self.classes
            .get(class)
            .map(|objects| objects.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// `FindMatchingSchema`: returns the name of the first class (by
    /// definition-name ordering) whose schema's required property names
    /// are all present as keys of `obj`.
    pub fn find_matching_schema<'s>(
        &self,
        obj: &Value,
        definitions: impl Iterator<Item = (&'s str, &'s SchemaNode)>,
    ) -> Option<&'s str> {
        let Some(obj_map) = obj.as_object() else {
            return None;
        };
        for (name, schema) in definitions {
            if schema
                .required
                .iter()
                .all(|field| obj_map.contains_key(field))
            {
                return Some(name);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::SchemaType;
    use serde_json::json;

    fn pet_schema() -> SchemaNode {
        let mut schema = SchemaNode::of_type(SchemaType::Object);
        schema
            .properties
            .insert("id".to_string(), SchemaNode::of_type(SchemaType::Integer));
        schema
            .properties
            .insert("name".to_string(), SchemaNode::of_type(SchemaType::String));
        schema.required = vec!["id".to_string()];
        schema
    }

    #[test]
    fn insert_then_find_all_fields() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        store
            .insert("Pet", &schema, json!({"id": 7, "name": "rex"}))
            .expect("should validate");

        let found = store.find(
            "Pet",
            &json!({"id": 7, "name": "rex"}),
            MatchFn::MatchAllFields,
            1,
        );
        assert_eq!(found, vec![json!({"id": 7, "name": "rex"})]);
    }

    #[test]
    fn insert_rejects_object_missing_required_field() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        let result = store.insert("Pet", &schema, json!({"name": "rex"}));
        assert!(result.is_err());
    }

    #[test]
    fn find_with_match_always_ignores_key() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        store.insert("Pet", &schema, json!({"id": 1})).unwrap();
        store.insert("Pet", &schema, json!({"id": 2})).unwrap();

        let found = store.find("Pet", &json!({}), MatchFn::MatchAlways, -1);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn find_respects_limit() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        for i in 0..5 {
            store.insert("Pet", &schema, json!({"id": i})).unwrap();
        }
        let found = store.find("Pet", &json!({}), MatchFn::MatchAlways, 2);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn update_merge_true_keeps_untouched_fields() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        store
            .insert("Pet", &schema, json!({"id": 7, "name": "rex"}))
            .unwrap();

        let touched = store.update(
            "Pet",
            &json!({"id": 7}),
            MatchFn::MatchAllFields,
            &json!({"name": "max"}),
            -1,
            true,
        );
        assert_eq!(touched, 1);

        let found = store.find("Pet", &json!({"id": 7}), MatchFn::MatchAllFields, -1);
        assert_eq!(found, vec![json!({"id": 7, "name": "max"})]);
    }

    #[test]
    fn update_merge_false_replaces_entirely() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        store
            .insert("Pet", &schema, json!({"id": 7, "name": "rex"}))
            .unwrap();

        store.update(
            "Pet",
            &json!({"id": 7}),
            MatchFn::MatchAllFields,
            &json!({"id": 7, "name": "max"}),
            -1,
            false,
        );

        let found = store.find("Pet", &json!({"id": 7}), MatchFn::MatchAllFields, -1);
        assert_eq!(found, vec![json!({"id": 7, "name": "max"})]);
    }

    #[test]
    fn update_returns_zero_when_no_match() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        store.insert("Pet", &schema, json!({"id": 7})).unwrap();

        let touched = store.update(
            "Pet",
            &json!({"id": 999}),
            MatchFn::MatchAllFields,
            &json!({"id": 999}),
            -1,
            false,
        );
        assert_eq!(touched, 0);
    }

    #[test]
    fn delete_removes_matching_objects_in_place() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        store.insert("Pet", &schema, json!({"id": 7})).unwrap();
        store.insert("Pet", &schema, json!({"id": 8})).unwrap();

        let removed = store.delete("Pet", &json!({"id": 7}), MatchFn::MatchAllFields, -1);
        assert_eq!(removed, 1);

        let remaining = store.find("Pet", &json!({}), MatchFn::MatchAlways, -1);
        assert_eq!(remaining, vec![json!({"id": 8})]);
    }

    #[test]
    fn sample_returns_up_to_limit_in_insertion_order() {
        let mut store = ShadowStore::new();
        let schema = pet_schema();
        for i in 0..10 {
            store.insert("Pet", &schema, json!({"id": i})).unwrap();
        }
        let sample = store.sample("Pet", 5);
        assert_eq!(sample.len(), 5);
        assert_eq!(sample[0], json!({"id": 0}));
    }

    #[test]
    fn find_matching_schema_picks_first_class_whose_required_fields_are_satisfied() {
        let store = ShadowStore::new();
        let pet = pet_schema();
        let mut owner = SchemaNode::of_type(SchemaType::Object);
        owner.required = vec!["owner_id".to_string()];

        let definitions: Vec<(&str, &SchemaNode)> = vec![("Owner", &owner), ("Pet", &pet)];
        let found =
            store.find_matching_schema(&json!({"id": 7, "name": "rex"}), definitions.into_iter());
        assert_eq!(found, Some("Pet"));
    }

    #[test]
    fn find_matching_schema_returns_none_when_nothing_satisfies() {
        let store = ShadowStore::new();
        let pet = pet_schema();
        let definitions: Vec<(&str, &SchemaNode)> = vec![("Pet", &pet)];
        let found = store.find_matching_schema(&json!({"unrelated": true}), definitions.into_iter());
        assert_eq!(found, None);
    }

    #[test]
    fn unknown_class_find_returns_empty() {
        let store = ShadowStore::new();
        assert!(store
            .find("Nope", &json!({}), MatchFn::MatchAlways, -1)
            .is_empty());
    }
}
