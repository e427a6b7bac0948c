//! Drives recursion through `$ref`s, objects, arrays, and primitives, and
//! resolves the effective class of an object (component C).

use crate::annotation::{self, MeqaTag};
use crate::config::RunnerConfig;

use super::model::{SchemaNode, SwaggerDocument};

/// Extracts the definition name from a `#/definitions/<name>` pointer.
fn ref_name(ref_: &str) -> Option<&str> {
    ref_.strip_prefix("#/definitions/")
}

/// Resolves a `$ref` chain starting at `node`, stopping at a primitive, a
/// cycle, or the configured depth cap (spec §9: "Cyclic schemas ... a
/// reasonable depth cap (e.g. 8) with deterministic termination is
/// acceptable").
///
/// Returns the resolved schema plus the nearest enclosing annotation: the
/// tag carried by the last `$ref`'d-to node that has one, with `class`
/// defaulted to the referent's definition name when the annotation itself
/// didn't specify one (spec §4.C: "propagating the nearest enclosing
/// annotation with a newly derived class name taken from the referent").
pub fn resolve<'doc>(
    doc: &'doc SwaggerDocument,
    node: &'doc SchemaNode,
    parent_tag: Option<MeqaTag>,
    config: &RunnerConfig,
) -> (&'doc SchemaNode, Option<MeqaTag>) {
    resolve_inner(doc, node, parent_tag, config, 0, &mut Vec::new())
}

fn resolve_inner<'doc>(
    doc: &'doc SwaggerDocument,
    node: &'doc SchemaNode,
    parent_tag: Option<MeqaTag>,
    config: &RunnerConfig,
    depth: u8,
    seen: &mut Vec<&'doc str>,
) -> (&'doc SchemaNode, Option<MeqaTag>) {
    let mut tag = annotation::parse(&node.description).or(parent_tag);

    let Some(ref_) = node.ref_.as_deref() else {
        return (node, tag);
    };
    let Some(name) = ref_name(ref_) else {
        return (node, tag);
    };

    if depth >= config.max_ref_depth() || seen.contains(&name) {
        // Cycle or depth cap: treat as a base object, stop recursing.
        return (node, tag);
    }

    let Some(referent) = doc.definitions.get(name) else {
        return (node, tag);
    };

    // The referent's own annotation (if any) takes precedence at this
    // level; otherwise inherit what we had, with `class` derived from the
    // referent's definition name when still unset.
    if tag.as_ref().is_none_or(|t| t.class.is_empty()) {
        let mut derived = tag.unwrap_or_default();
        derived.class = name.to_string();
        tag = Some(derived);
    }

    seen.push(name);
    resolve_inner(doc, referent, tag, config, depth + 1, seen)
}

/// `GetSchemaRootType`: for array-of-object or object parameters, returns
/// the object schema and its effective class. For primitives (including
/// arrays of primitives), returns `None` (spec §4.C).
pub fn root_object_type<'doc>(
    doc: &'doc SwaggerDocument,
    node: &'doc SchemaNode,
    parent_tag: Option<MeqaTag>,
    config: &RunnerConfig,
) -> Option<(MeqaTag, &'doc SchemaNode)> {
    use super::model::SchemaType;

    let (resolved, tag) = resolve(doc, node, parent_tag, config);

    match resolved.type_ {
        Some(SchemaType::Object) => Some((tag.unwrap_or_default(), resolved)),
        Some(SchemaType::Array) => {
            let item_schema = resolved.items.as_ref()?.schema_for_generation()?;
            root_object_type(doc, item_schema, tag, config)
        }
        _ if !resolved.properties.is_empty() => Some((tag.unwrap_or_default(), resolved)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{Items, SchemaType};
    use indexmap::IndexMap;

    fn doc_with_pet() -> SwaggerDocument {
        let mut definitions = IndexMap::new();
        definitions.insert(
            "Pet".to_string(),
            SchemaNode {
                type_: Some(SchemaType::Object),
                properties: {
                    let mut p = IndexMap::new();
                    p.insert("id".to_string(), SchemaNode::of_type(SchemaType::Integer));
                    p.insert("name".to_string(), SchemaNode::of_type(SchemaType::String));
                    p
                },
                required: vec!["id".to_string()],
                ..Default::default()
            },
        );
        SwaggerDocument {
            definitions,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_simple_ref_and_derives_class_from_referent() {
        let doc = doc_with_pet();
        let config = RunnerConfig::default();
        let reference = SchemaNode {
            ref_: Some("#/definitions/Pet".to_string()),
            ..Default::default()
        };

        let (resolved, tag) = resolve(&doc, &reference, None, &config);
        assert_eq!(resolved.type_, Some(SchemaType::Object));
        assert_eq!(tag.expect("should derive a tag").class, "Pet");
    }

    #[test]
    fn parent_annotation_is_preserved_through_ref() {
        let doc = doc_with_pet();
        let config = RunnerConfig::default();
        let reference = SchemaNode {
            ref_: Some("#/definitions/Pet".to_string()),
            ..Default::default()
        };
        let parent_tag = annotation::parse("@meqa[:id]");

        let (_, tag) = resolve(&doc, &reference, parent_tag, &config);
        let tag = tag.expect("should have a tag");
        // class was empty on the parent tag, so it's derived from the referent
        assert_eq!(tag.class, "Pet");
        assert_eq!(tag.property, "id");
    }

    #[test]
    fn node_level_annotation_wins_over_parent() {
        let doc = doc_with_pet();
        let config = RunnerConfig::default();
        let reference = SchemaNode {
            ref_: Some("#/definitions/Pet".to_string()),
            description: "@meqa[Pet:name]".to_string(),
            ..Default::default()
        };
        let parent_tag = annotation::parse("@meqa[Owner:id]");

        let (_, tag) = resolve(&doc, &reference, parent_tag, &config);
        let tag = tag.expect("should have a tag");
        assert_eq!(tag.class, "Pet");
        assert_eq!(tag.property, "name");
    }

    #[test]
    fn cyclic_ref_terminates_at_depth_cap() {
        let mut definitions = IndexMap::new();
        definitions.insert(
            "Node".to_string(),
            SchemaNode {
                ref_: Some("#/definitions/Node".to_string()),
                ..Default::default()
            },
        );
        let doc = SwaggerDocument {
            definitions,
            ..Default::default()
        };
        let config = RunnerConfig::builder().with_max_ref_depth(8).build();
        let reference = SchemaNode {
            ref_: Some("#/definitions/Node".to_string()),
            ..Default::default()
        };

        // Must terminate rather than recurse forever.
        let (resolved, _) = resolve(&doc, &reference, None, &config);
        assert!(resolved.ref_.is_some());
    }

    #[test]
    fn root_object_type_returns_none_for_primitive() {
        let doc = SwaggerDocument::default();
        let config = RunnerConfig::default();
        let node = SchemaNode::of_type(SchemaType::String);
        assert!(root_object_type(&doc, &node, None, &config).is_none());
    }

    #[test]
    fn root_object_type_descends_into_array_items() {
        let doc = doc_with_pet();
        let config = RunnerConfig::default();
        let array = SchemaNode {
            type_: Some(SchemaType::Array),
            items: Some(Items::Single(Box::new(SchemaNode {
                ref_: Some("#/definitions/Pet".to_string()),
                ..Default::default()
            }))),
            ..Default::default()
        };

        let (tag, resolved) = root_object_type(&doc, &array, None, &config).expect("should find object");
        assert_eq!(tag.class, "Pet");
        assert_eq!(resolved.type_, Some(SchemaType::Object));
    }

    #[test]
    fn root_object_type_matches_bare_object_schema() {
        let doc = SwaggerDocument::default();
        let config = RunnerConfig::default();
        let mut node = SchemaNode::of_type(SchemaType::Object);
        node.properties
            .insert("id".to_string(), SchemaNode::of_type(SchemaType::Integer));

        let (_, resolved) = root_object_type(&doc, &node, None, &config).expect("should match");
        assert_eq!(resolved.type_, Some(SchemaType::Object));
    }
}
