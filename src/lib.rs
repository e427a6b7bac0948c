//! A deterministic, schema-driven test-planning engine for black-box API
//! testing against Swagger 2.0 (OpenAPI) documents.
//!
//! Given a parsed [`SwaggerDocument`](schema::SwaggerDocument) and a plan of
//! [`Test`](plan::Test)s, [`TestRunner`](plan::TestRunner) resolves each
//! test's parameters (reusing earlier results or synthesizing fresh,
//! schema-conforming values via [`schema::Generator`]), dispatches the
//! request through an [`HttpTransport`](transport::HttpTransport), and
//! reconciles the response against an in-memory [`ShadowStore`](store::ShadowStore)
//! that mirrors what the engine believes the server's state should be.
//!
//! Test chaining (`ref`) is handled by the caller-supplied
//! [`PlanOrchestrator`](plan::PlanOrchestrator); the runner itself only
//! executes one resolved test at a time.

pub mod annotation;
pub mod compare;
pub mod config;
pub mod error;
pub mod plan;
pub mod rng;
pub mod schema;
pub mod store;
pub mod transport;

pub use annotation::MeqaTag;
pub use config::RunnerConfig;
pub use error::{MeqaError, Result};
pub use plan::{Expect, PlanOrchestrator, Test, TestOutcome, TestRunner};
pub use schema::{Generator, SwaggerDocument};
pub use store::ShadowStore;
pub use transport::{HttpRequest, HttpResponse, HttpTransport};

#[cfg(feature = "http-transport")]
pub use transport::ReqwestTransport;
