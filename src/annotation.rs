//! `@meqa[Class:Property].Operation` annotation parsing (component A).

use std::sync::LazyLock;

use regex::Regex;

/// Regex matching the annotation grammar from the spec:
/// `@meqa[<Class>[:<Property>]][.<Operation>]`.
static RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@meqa\[(?<class>[A-Za-z]*):?(?<property>[A-Za-z]*)\]\.?(?<operation>[A-Za-z]*)")
        .expect("a valid regex")
});

/// A parsed `@meqa[...]` annotation extracted from a schema or operation
/// description.
///
/// Any field may be empty: `Class` names a schema definition, `Property` a
/// field within it, and `Operation` overrides the HTTP method's semantic
/// (`read`/`write`/`get`/`post`/…).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeqaTag {
    /// Schema definition name, or empty if the annotation didn't name one.
    pub class: String,
    /// Field name within `class`, or empty.
    pub property: String,
    /// Operation override (`read`, `write`, `get`, `post`, …), or empty.
    pub operation: String,
}

impl MeqaTag {
    /// Returns `true` if the tag carries neither a class nor a property.
    pub fn is_empty(&self) -> bool {
        self.class.is_empty() && self.property.is_empty() && self.operation.is_empty()
    }

    /// Serializes the tag back to its `@meqa[...]` textual form.
    ///
    /// Round-tripping this through [`parse`] yields an equal tag (invariant
    /// 4 in the spec's Testable Properties).
    pub fn to_annotation_string(&self) -> String {
        let mut out = format!("@meqa[{}:{}]", self.class, self.property);
        if !self.operation.is_empty() {
            out.push('.');
            out.push_str(&self.operation);
        }
        out
    }
}

/// Extracts the first `@meqa[...]` annotation from a free-text description.
///
/// Returns `None` when the description contains no match. The first match
/// wins; any text after the match (or before it) is ignored.
pub fn parse(desc: &str) -> Option<MeqaTag> {
    let caps = RE.captures(desc)?;
    let class = caps.name("class").map(|m| m.as_str()).unwrap_or_default();
    let property = caps
        .name("property")
        .map(|m| m.as_str())
        .unwrap_or_default();
    let operation = caps
        .name("operation")
        .map(|m| m.as_str())
        .unwrap_or_default();

    Some(MeqaTag {
        class: class.to_string(),
        property: property.to_string(),
        operation: operation.to_string(),
    })
}
