//! Schema representation, `$ref` resolution, and value generation
//! (components B and C).

pub mod generator;
pub mod model;
mod pattern;
pub mod validate;
pub mod walker;

pub use generator::Generator;
pub use model::{
    HttpMethod, Items, ParamLocation, Parameter, PathItem, Operation, ResponseSpec, SchemaNode,
    SchemaType, SwaggerDocument,
};
