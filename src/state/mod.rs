//! Tree-shaped state and path queries over it.
//!
//! [`Tree`] nodes are shared between successive states, so identity
//! comparison of a subtree tells whether anything below it was replaced.

mod path;
mod tree;

pub use path::{JsonPath, JsonPathEvaluator, PathEvaluator, DEFAULT_PATH_CACHE_SIZE};
pub use tree::Tree;
