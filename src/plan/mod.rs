//! The plan DSL and the runner that executes it.

mod orchestrator;
mod runner;

pub use orchestrator::PlanOrchestrator;
pub use runner::{TestOutcome, TestRunner};
pub use test::{Expect, Test};
