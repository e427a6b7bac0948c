//! The interface the runner delegates test chaining to.

use async_trait::async_trait;

use crate::error::Result;

use super::runner::TestOutcome;
use super::test::Test;

/// Runs a named test (and, transitively, anything it `ref`s), returning
/// every test outcome produced along the way.
///
/// Kept external to the runner so a plan file's test-name lookup and
/// execution ordering stay the caller's responsibility — the runner itself
/// only needs this one call to expand a `ref`.
#[async_trait]
pub trait PlanOrchestrator: Send + Sync {
    /// Runs the test named `test_name`, merging `parent`'s parameters in
    /// first when this call is itself a `ref` expansion.
    async fn run(&self, test_name: &str, parent: Option<&Test>) -> Result<Vec<TestOutcome>>;
}
