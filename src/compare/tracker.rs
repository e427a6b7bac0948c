//! The comparison tracker (component E): a per-test ledger linking
//! generated values to the shadow-store mutations a successful response is
//! expected to produce.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::annotation::MeqaTag;
use crate::schema::model::{HttpMethod, ParamLocation, SchemaNode};

/// One pending comparison: a `(old, new)` pair of values, plus the schema
/// they're checked against during reconciliation (spec §4.F step 8).
#[derive(Debug, Clone)]
pub struct Comparison {
    /// The value the shadow store held before the operation, if any.
    pub old: Option<Value>,
    /// The value the operation is expected to produce, if any.
    pub new: Option<Value>,
    /// The schema both sides validate against.
    pub schema: SchemaNode,
}

impl Comparison {
    fn empty(schema: SchemaNode) -> Self {
        Self {
            old: None,
            new: None,
            schema,
        }
    }
}

/// Whether a parameter registration implies a read (the value is expected
/// to already exist, captured as `old`) or a write (the value is what the
/// operation will produce, captured as `new`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Captured as the comparison's `old` value.
    Old,
    /// Captured as the comparison's `new` value.
    New,
}

impl Side {
    /// Resolves the side from a `@meqa[...]` operation override, falling
    /// back to the parameter's location-implied default (spec §4.E point
    /// 1: "resolve `op` from tag or from `paramSpec.in`").
    pub fn resolve(operation_override: &str, location: ParamLocation) -> Self {
        match operation_override.to_ascii_lowercase().as_str() {
            "write" | "post" | "put" | "patch" | "delete" => Side::New,
            "read" | "get" => Side::Old,
            _ if location.default_is_write() => Side::New,
            _ => Side::Old,
        }
    }
}

/// Per-test mapping `class -> sequence<Comparison>` (spec §4.E).
///
/// A fresh, empty tracker must be created for every test, even a duplicated
/// one — comparison ledgers must never be shared across test instances
/// (spec §9: "Comparison tracker aliasing").
#[derive(Debug, Clone, Default)]
pub struct ComparisonTracker {
    classes: IndexMap<String, Vec<Comparison>>,
}

impl ComparisonTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over all tracked classes and their comparison sequences.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[Comparison])> {
        self.classes
            .iter()
            .map(|(class, comparisons)| (class.as_str(), comparisons.as_slice()))
    }

    /// The comparisons tracked for `class`, if any.
    pub fn for_class(&self, class: &str) -> Option<&[Comparison]> {
        self.classes.get(class).map(Vec::as_slice)
    }

    /// Registration path 1 ("Basic"): registers a scalar parameter value
    /// under `tag`. A no-op unless both `tag.class` and `tag.property` are
    /// set.
    ///
    /// The scalar is wrapped into a single-field object keyed by
    /// `tag.property` before being stored, so reconciliation (spec §4.F
    /// step 8) can use it directly as a `MatchAllFields` key against the
    /// shadow store's full objects — a bare scalar wouldn't be matchable
    /// against stored objects at all.
    pub fn register_basic(&mut self, tag: &MeqaTag, location: ParamLocation, value: Value) {
        if tag.class.is_empty() || tag.property.is_empty() {
            return;
        }
        let wrapped = Value::Object(serde_json::Map::from_iter([(tag.property.clone(), value)]));
        let side = Side::resolve(&tag.operation, location);
        let comparisons = self.classes.entry(tag.class.clone()).or_default();

        let slot_is_free = |comparison: &Comparison| match side {
            Side::Old => comparison.old.is_none(),
            Side::New => comparison.new.is_none(),
        };

        let needs_new = match comparisons.last() {
            Some(last) if slot_is_free(last) => false,
            _ => true,
        };
        if needs_new {
            comparisons.push(Comparison::empty(SchemaNode::default()));
        }
        let slot = comparisons.last_mut().expect("just ensured non-empty");
        match side {
            Side::Old => slot.old = Some(wrapped),
            Side::New => slot.new = Some(wrapped),
        }
    }

    /// Reads the most recently captured value for `(class, property)`, for
    /// the cross-test data reuse heuristic (spec §4.B). Property values
    /// aren't addressable directly on a [`Comparison`] (it stores whole
    /// objects), so callers extract the field themselves; this returns the
    /// candidate object to read from.
    pub fn latest_object(&self, class: &str) -> Option<&Value> {
        let comparisons = self.classes.get(class)?;
        comparisons
            .iter()
            .rev()
            .find_map(|c| c.new.as_ref().or(c.old.as_ref()))
    }

    /// Registration path 2 ("Object"): registers a generated/body object
    /// under `class` for `method`.
    pub fn register_object(
        &mut self,
        class: &str,
        method: HttpMethod,
        obj: Value,
        schema: SchemaNode,
    ) {
        let comparisons = self.classes.entry(class.to_string()).or_default();
        match method {
            HttpMethod::Post => {
                comparisons.push(Comparison {
                    old: None,
                    new: Some(obj),
                    schema,
                });
            }
            HttpMethod::Put | HttpMethod::Patch => {
                match comparisons.last_mut() {
                    Some(last) if last.new.is_none() => {
                        last.new = Some(obj);
                        last.schema = schema;
                    }
                    _ => comparisons.push(Comparison {
                        old: None,
                        new: Some(obj),
                        schema,
                    }),
                }
            }
            other => {
                debug!(method = other.as_str(), class, "ignoring object registration for non-mutating method");
            }
        }
    }

    /// Registers a read: a value the generator sampled from the shadow
    /// store, captured as `old` so reconciliation can verify it's still
    /// present (or absent, for DELETE).
    pub fn register_read(&mut self, class: &str, obj: Value, schema: SchemaNode) {
        let comparisons = self.classes.entry(class.to_string()).or_default();
        match comparisons.last_mut() {
            Some(last) if last.old.is_none() => {
                last.old = Some(obj);
                last.schema = schema;
            }
            _ => comparisons.push(Comparison {
                old: Some(obj),
                new: None,
                schema,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn basic_registration_is_noop_without_class_and_property() {
        let mut tracker = ComparisonTracker::new();
        tracker.register_basic(&MeqaTag::default(), ParamLocation::Query, json!(7));
        assert!(tracker.for_class("").is_none());
    }

    #[test]
    fn basic_registration_fills_free_slot_then_opens_new() {
        let mut tracker = ComparisonTracker::new();
        let tag = MeqaTag {
            class: "Pet".to_string(),
            property: "id".to_string(),
            operation: "read".to_string(),
        };
        tracker.register_basic(&tag, ParamLocation::Query, json!(7));
        tracker.register_basic(&tag, ParamLocation::Query, json!(8));

        let comparisons = tracker.for_class("Pet").expect("tracked");
        assert_eq!(comparisons.len(), 2);
        assert_eq!(comparisons[0].old, Some(json!({"id": 7})));
        assert_eq!(comparisons[1].old, Some(json!({"id": 8})));
    }

    #[test]
    fn default_side_follows_param_location() {
        let mut tracker = ComparisonTracker::new();
        let tag = MeqaTag {
            class: "Pet".to_string(),
            property: "id".to_string(),
            operation: String::new(),
        };
        tracker.register_basic(&tag, ParamLocation::Body, json!(7));

        let comparisons = tracker.for_class("Pet").expect("tracked");
        assert_eq!(comparisons[0].new, Some(json!({"id": 7})));
        assert_eq!(comparisons[0].old, None);
    }

    #[test]
    fn post_appends_new_comparison_each_time() {
        let mut tracker = ComparisonTracker::new();
        tracker.register_object("Pet", HttpMethod::Post, json!({"id": 1}), SchemaNode::default());
        tracker.register_object("Pet", HttpMethod::Post, json!({"id": 2}), SchemaNode::default());

        let comparisons = tracker.for_class("Pet").expect("tracked");
        assert_eq!(comparisons.len(), 2);
    }

    #[test]
    fn patch_fills_free_new_slot_before_opening_new_comparison() {
        let mut tracker = ComparisonTracker::new();
        tracker.register_read("Pet", json!({"id": 1}), SchemaNode::default());
        tracker.register_object("Pet", HttpMethod::Patch, json!({"id": 1, "name": "max"}), SchemaNode::default());

        let comparisons = tracker.for_class("Pet").expect("tracked");
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].old, Some(json!({"id": 1})));
        assert_eq!(comparisons[0].new, Some(json!({"id": 1, "name": "max"})));
    }

    #[test]
    fn get_method_object_registration_is_ignored() {
        let mut tracker = ComparisonTracker::new();
        tracker.register_object("Pet", HttpMethod::Get, json!({"id": 1}), SchemaNode::default());
        assert!(tracker.for_class("Pet").unwrap().is_empty());
    }

    #[test]
    fn latest_object_prefers_new_over_old() {
        let mut tracker = ComparisonTracker::new();
        tracker.register_object("Pet", HttpMethod::Post, json!({"id": 1}), SchemaNode::default());
        assert_eq!(tracker.latest_object("Pet"), Some(&json!({"id": 1})));
    }
}
