//! The value generator (component B): synthesizes schema-conforming JSON
//! values, reusing values produced by earlier tests wherever a `@meqa`
//! annotation names a class/property the shadow store already knows about.

use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexSet;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::annotation::MeqaTag;
use crate::compare::ComparisonTracker;
use crate::config::RunnerConfig;
use crate::error::{MeqaError, Result};
use crate::rng::EngineRng;
use crate::store::{MatchFn, ShadowStore};

use super::model::{HttpMethod, SchemaNode, SchemaType, SwaggerDocument};
use super::pattern;
use super::walker;

const THIRTY_DAYS_SECONDS: i64 = 86_400 * 30;

/// Generates values against `doc`'s definitions, sharing `rng`, `store` and
/// `tracker` across the whole test.
pub struct Generator<'doc> {
    doc: &'doc SwaggerDocument,
    config: &'doc RunnerConfig,
}

impl<'doc> Generator<'doc> {
    /// Creates a generator bound to a document and its runner configuration.
    pub fn new(doc: &'doc SwaggerDocument, config: &'doc RunnerConfig) -> Self {
        Self { doc, config }
    }

    /// Generates a value for `node`, under `parent_tag`, for the comparison
    /// side implied by `method`. `prefix` seeds synthetic strings generated
    /// without a `pattern` (spec §4.B: "synthesize pattern `<prefix>\d+`").
    pub fn generate(
        &self,
        node: &SchemaNode,
        parent_tag: Option<MeqaTag>,
        method: HttpMethod,
        prefix: &str,
        rng: &mut EngineRng,
        store: &mut ShadowStore,
        tracker: &mut ComparisonTracker,
    ) -> Result<Value> {
        let (resolved, tag) = walker::resolve(self.doc, node, parent_tag, self.config);

        if let Some(tag) = tag.as_ref() {
            if !tag.property.is_empty() {
                if let Some(reused) = self.reuse(tag, rng, store, tracker) {
                    return Ok(reused);
                }
            }
        }

        if let Some(enum_values) = resolved.enum_values.as_ref() {
            return self.generate_enum(enum_values, rng);
        }

        let Some(type_) = resolved.type_ else {
            return Err(MeqaError::invalid("schema node has no type and no enum"));
        };

        match type_ {
            SchemaType::Boolean => Ok(Value::Bool(rng.inner().gen_bool(0.5))),
            SchemaType::Integer => self.generate_integer(resolved, rng),
            SchemaType::Number => Ok(serde_json::json!(self.sample_number(resolved, false, rng)?)),
            SchemaType::String => self.generate_string(resolved, prefix, rng),
            SchemaType::Array => {
                self.generate_array(resolved, tag, method, prefix, rng, store, tracker)
            }
            SchemaType::Object => {
                self.generate_object(resolved, tag, method, prefix, rng, store, tracker)
            }
        }
    }

    /// The cross-test data reuse heuristic (spec §4.B): reads a value
    /// already captured for `(tag.class, tag.property)` this test, or
    /// samples one of up to 5 stored instances of `tag.class`.
    fn reuse(
        &self,
        tag: &MeqaTag,
        rng: &mut EngineRng,
        store: &mut ShadowStore,
        tracker: &mut ComparisonTracker,
    ) -> Option<Value> {
        if tag.class.is_empty() {
            return None;
        }
        if let Some(object) = tracker.latest_object(&tag.class) {
            if let Some(value) = object.get(&tag.property) {
                return Some(value.clone());
            }
        }

        let candidates = store.sample(&tag.class, 5);
        if candidates.is_empty() {
            return None;
        }
        let picked = candidates[rng.inner().gen_range(0..candidates.len())].clone();
        let value = picked.get(&tag.property).cloned();
        if value.is_some() {
            tracker.register_read(&tag.class, picked, SchemaNode::default());
        }
        value
    }

    fn generate_enum(&self, values: &[Value], rng: &mut EngineRng) -> Result<Value> {
        if values.is_empty() {
            return Err(MeqaError::invalid("enum has no values"));
        }
        let index = rng.inner().gen_range(0..values.len());
        Ok(values[index].clone())
    }

    fn generate_integer(&self, schema: &SchemaNode, rng: &mut EngineRng) -> Result<Value> {
        let sampled = self.sample_number(schema, true, rng)?;
        let mut truncated = sampled.trunc() as i64;
        if let Some(minimum) = schema.minimum {
            if truncated as f64 == minimum {
                truncated += 1;
            }
        }
        Ok(Value::from(truncated))
    }

    /// Shared by [`Self::generate_integer`] and the `number` branch (spec
    /// §4.B). `integer_context` applies the "default max = 10000 when
    /// neither bound is supplied" override for integers.
    fn sample_number(&self, schema: &SchemaNode, integer_context: bool, rng: &mut EngineRng) -> Result<f64> {
        let (minimum, maximum) = if integer_context && schema.minimum.is_none() && schema.maximum.is_none() {
            (None, Some(self.config.default_integer_max() as f64))
        } else {
            (schema.minimum, schema.maximum)
        };

        let lo = minimum.map(|m| if schema.exclusive_minimum { m + 0.01 } else { m });
        let hi = maximum.map(|m| if schema.exclusive_maximum { m - 0.01 } else { m });

        let (lo, hi) = match (lo, hi) {
            (None, None) => (-1.0, 1.0),
            // `lo + lo.abs()` degenerates to `(0.0, 0.0)` when `lo == 0`
            // (an ordinary bound for ids/counts); widen to a unit window
            // rather than handing `gen_range` an empty range.
            (Some(lo), None) => {
                let hi = lo + lo.abs();
                if hi > lo { (lo, hi) } else { (lo, lo + 1.0) }
            }
            (None, Some(hi)) => {
                let lo = hi - hi.abs();
                if lo < hi { (lo, hi) } else { (hi - 1.0, hi) }
            }
            (Some(lo), Some(hi)) => {
                if lo >= hi {
                    return Err(MeqaError::invalid(format!(
                        "conflicting numeric bounds: minimum {lo} >= maximum {hi}"
                    )));
                }
                (lo, hi)
            }
        };

        Ok(rng.inner().gen_range(lo..hi))
    }

    fn generate_string(&self, schema: &SchemaNode, prefix: &str, rng: &mut EngineRng) -> Result<Value> {
        match schema.format.as_deref() {
            Some("date-time") => return Ok(Value::String(random_recent_timestamp(rng, true))),
            Some("date") => return Ok(Value::String(random_recent_timestamp(rng, false))),
            _ => {}
        }

        let raw = if let Some(user_pattern) = schema.pattern.as_deref() {
            pattern::generate(user_pattern, user_pattern.len() * 2, rng.inner())?
        } else {
            let synthesized = format!("{prefix}\\d+");
            pattern::generate(&synthesized, prefix.len() + 5, rng.inner())?
        };

        match schema.format.as_deref() {
            None | Some("" | "password") => Ok(Value::String(raw)),
            Some("byte") => Ok(Value::String(
                base64::engine::general_purpose::STANDARD.encode(raw.as_bytes()),
            )),
            Some("binary") => Ok(Value::String(hex_encode(raw.as_bytes()))),
            Some(other) => Err(MeqaError::invalid(format!("unsupported string format {other:?}"))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_array(
        &self,
        schema: &SchemaNode,
        tag: Option<MeqaTag>,
        method: HttpMethod,
        prefix: &str,
        rng: &mut EngineRng,
        store: &mut ShadowStore,
        tracker: &mut ComparisonTracker,
    ) -> Result<Value> {
        let range = self.config.default_array_range();
        let min = schema.min_items.unwrap_or(range.start);
        let max = schema.max_items.unwrap_or(range.end).max(min + 1);
        let n = if max > min { rng.inner().gen_range(min..max) } else { min };

        let Some(item_schema) = schema.items.as_ref().and_then(|items| items.schema_for_generation())
        else {
            return Err(MeqaError::invalid("array schema has no items"));
        };

        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(self.generate(item_schema, tag.clone(), method, prefix, rng, store, tracker)?);
        }

        if schema.unique_items {
            let mut seen = IndexSet::new();
            values.retain(|value| seen.insert(canonicalize(value)));
        }

        Ok(Value::Array(values))
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_object(
        &self,
        schema: &SchemaNode,
        tag: Option<MeqaTag>,
        method: HttpMethod,
        prefix: &str,
        rng: &mut EngineRng,
        store: &mut ShadowStore,
        tracker: &mut ComparisonTracker,
    ) -> Result<Value> {
        let mut map = serde_json::Map::with_capacity(schema.properties.len());
        for (name, property_schema) in &schema.properties {
            let property_prefix = format!("{name}_");
            let value = self.generate(
                property_schema,
                tag.clone(),
                method,
                &property_prefix,
                rng,
                store,
                tracker,
            )?;
            map.insert(name.clone(), value);
        }
        let _ = prefix;
        let object = Value::Object(map);

        let class = tag
            .as_ref()
            .map(|t| t.class.clone())
            .filter(|c| !c.is_empty())
            .or_else(|| {
                store
                    .find_matching_schema(&object, self.doc.definitions.iter().map(|(k, v)| (k.as_str(), v)))
                    .map(str::to_string)
            });

        match class {
            Some(class) => tracker.register_object(&class, method, object.clone(), schema.clone()),
            None => debug!("generated object matched no known class; skipping comparison registration"),
        }

        Ok(object)
    }
}

/// JSON-string canonicalization for `uniqueItems` dedup over non-hashable
/// composite values (spec §9: "String dedup with `uniqueItems`").
fn canonicalize(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn random_recent_timestamp(rng: &mut EngineRng, with_time: bool) -> String {
    let offset = rng.inner().gen_range(0..=THIRTY_DAYS_SECONDS);
    let sampled: DateTime<Utc> = Utc::now() - Duration::seconds(offset);

    if with_time {
        sampled.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    } else {
        sampled.format("%Y-%m-%d").to_string()
    }
}
