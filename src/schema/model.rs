//! Typed representation of the Swagger 2.0 document tree this crate
//! consumes — the parsed, dereference-capable schema tree an OpenAPI
//! loader hands in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A full Swagger 2.0 document, restricted to the fields the engine reads:
/// `schemes`, `host`, `basePath`, `paths`, and `definitions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwaggerDocument {
    /// Declared transport schemes (`http`, `https`, …), in document order.
    #[serde(default)]
    pub schemes: Vec<String>,
    /// Host (authority), e.g. `api.example.com`.
    #[serde(default)]
    pub host: String,
    /// Base path prefix, e.g. `/v1`.
    #[serde(default, rename = "basePath")]
    pub base_path: String,
    /// Named schema definitions, addressable via `#/definitions/<name>`.
    #[serde(default)]
    pub definitions: IndexMap<String, SchemaNode>,
    /// Path templates to their supported operations.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
}

impl SwaggerDocument {
    /// Looks up the operation bound to `method` at `path`.
    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.by_method(method))
    }

    /// Computes `scheme://host/basePath`: scheme prefers `http`, then
    /// `https`, then the first declared scheme, defaulting to `http` when
    /// none are declared.
    pub fn base_url(&self) -> String {
        let scheme = if self.schemes.iter().any(|s| s == "http") {
            "http"
        } else if self.schemes.iter().any(|s| s == "https") {
            "https"
        } else {
            self.schemes.first().map(String::as_str).unwrap_or("http")
        };
        format!("{scheme}://{}{}", self.host, self.base_path)
    }
}

/// The seven HTTP methods a Swagger 2.0 path item can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `PATCH`
    Patch,
    /// `OPTIONS`
    Options,
}

impl HttpMethod {
    /// Parses a case-insensitive HTTP method name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            "POST" => Some(Self::Post),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "PATCH" => Some(Self::Patch),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// The canonical uppercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether this method's default semantic is a write (used to resolve
    /// a comparison's operation when no `@meqa` override applies).
    pub fn is_write(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch | Self::Delete)
    }
}

/// Operations declared for a single path template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// `GET` operation.
    pub get: Option<Operation>,
    /// `PUT` operation.
    pub put: Option<Operation>,
    /// `POST` operation.
    pub post: Option<Operation>,
    /// `DELETE` operation.
    pub delete: Option<Operation>,
    /// `HEAD` operation.
    pub head: Option<Operation>,
    /// `PATCH` operation.
    pub patch: Option<Operation>,
    /// `OPTIONS` operation.
    pub options: Option<Operation>,
}

impl PathItem {
    /// Returns the operation bound to `method`, if declared.
    pub fn by_method(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
        }
    }
}

/// A single operation (HTTP verb bound to a path).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Free-text description; `@meqa[...]` annotations are extracted from
    /// here.
    #[serde(default)]
    pub description: String,
    /// Declared parameters, in document order.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Declared responses, keyed by status code string or `"default"`.
    #[serde(default)]
    pub responses: IndexMap<String, ResponseSpec>,
}

/// Where a parameter is carried on the wire: a tagged variant rather than a
/// bare string, so each location's serialization rule lives in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamLocation {
    /// Path template placeholder (`{name}`).
    Path,
    /// Query string parameter.
    Query,
    /// HTTP header.
    Header,
    /// `application/x-www-form-urlencoded` form field.
    FormData,
    /// Request body.
    Body,
}

impl ParamLocation {
    /// The default comparison operation a parameter in this location
    /// implies when no `@meqa` override is present: `body`/`formData` imply
    /// a write, everything else implies a read.
    pub fn default_is_write(self) -> bool {
        matches!(self, Self::Body | Self::FormData)
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where it's carried.
    #[serde(rename = "in")]
    pub location: ParamLocation,
    /// Whether the parameter is required.
    #[serde(default)]
    pub required: bool,
    /// For `in: body` parameters, the nested body schema.
    #[serde(default)]
    pub schema: Option<SchemaNode>,
    /// For non-body parameters, Swagger 2.0 inlines `type`/`format`/
    /// validation keywords directly on the parameter object rather than
    /// nesting a `schema`. This crate parses them into the same
    /// [`SchemaNode`] shape so [`Parameter::effective_schema`] can promote
    /// them uniformly.
    #[serde(flatten, default)]
    pub inline: SchemaNode,
}

impl Parameter {
    /// Returns the schema this parameter should be generated/validated
    /// against: the nested `schema` for body parameters, or the inlined
    /// fields promoted into a [`SchemaNode`] for everything else.
    pub fn effective_schema(&self) -> &SchemaNode {
        self.schema.as_ref().unwrap_or(&self.inline)
    }
}

/// A single declared response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Free-text description; carries `@meqa[success]`/`@meqa[fail]`
    /// overrides.
    #[serde(default)]
    pub description: String,
    /// The response body schema, if any.
    pub schema: Option<SchemaNode>,
}

/// The primitive JSON-schema types this engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `array`
    Array,
    /// `object`
    Object,
}

/// `items` can be a single schema (homogeneous arrays) or a tuple of
/// schemas (positional/tuple validation) — spec §4.B: "Generate n items
/// from items.schema (or first of items.schemas)".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    /// A single schema applied to every array element.
    Single(Box<SchemaNode>),
    /// A tuple of per-position schemas; the generator uses the first.
    Tuple(Vec<SchemaNode>),
}

impl Items {
    /// The schema to use for generation, per spec §4.B.
    pub fn schema_for_generation(&self) -> Option<&SchemaNode> {
        match self {
            Self::Single(schema) => Some(schema),
            Self::Tuple(schemas) => schemas.first(),
        }
    }
}

/// A JSON-schema node, restricted to the fields the engine consumes
/// (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaNode {
    /// `$ref` pointer, e.g. `#/definitions/Pet`.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    /// Free-text description; carries `@meqa[...]` annotations.
    #[serde(default)]
    pub description: String,
    /// JSON-schema primitive type.
    #[serde(rename = "type", default)]
    pub type_: Option<SchemaType>,
    /// String `format` (`date-time`, `date`, `password`, `byte`, `binary`, …).
    #[serde(default)]
    pub format: Option<String>,
    /// Regex the generated string must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Enumerated allowed values.
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<serde_json::Value>>,
    /// Default value (unused by generation directly, carried for fidelity).
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Declared object properties.
    #[serde(default)]
    pub properties: IndexMap<String, SchemaNode>,
    /// Required property names.
    #[serde(default)]
    pub required: Vec<String>,
    /// Array element schema(s).
    #[serde(default)]
    pub items: Option<Items>,
    /// Numeric inclusive minimum.
    #[serde(default)]
    pub minimum: Option<f64>,
    /// Numeric inclusive (unless `exclusive_maximum`) maximum.
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Whether `minimum` is exclusive.
    #[serde(default, rename = "exclusiveMinimum")]
    pub exclusive_minimum: bool,
    /// Whether `maximum` is exclusive.
    #[serde(default, rename = "exclusiveMaximum")]
    pub exclusive_maximum: bool,
    /// Minimum string length.
    #[serde(default, rename = "minLength")]
    pub min_length: Option<usize>,
    /// Maximum string length.
    #[serde(default, rename = "maxLength")]
    pub max_length: Option<usize>,
    /// Minimum array length.
    #[serde(default, rename = "minItems")]
    pub min_items: Option<usize>,
    /// Maximum array length.
    #[serde(default, rename = "maxItems")]
    pub max_items: Option<usize>,
    /// Whether array elements must be pairwise distinct.
    #[serde(default, rename = "uniqueItems")]
    pub unique_items: bool,
    /// Numeric multiple-of constraint (carried for fidelity; not enforced
    /// by the generator beyond what the spec requires).
    #[serde(default, rename = "multipleOf")]
    pub multiple_of: Option<f64>,
}

impl SchemaNode {
    /// A bare schema of the given primitive type, otherwise default.
    pub fn of_type(type_: SchemaType) -> Self {
        Self {
            type_: Some(type_),
            ..Self::default()
        }
    }
}
