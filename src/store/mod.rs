//! Shadow object store (component D).

mod db;

pub use db::{MatchFn, ShadowStore};
