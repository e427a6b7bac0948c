//! Comparison tracker (component E).

mod tracker;

pub use tracker::{Comparison, ComparisonTracker, Side};
