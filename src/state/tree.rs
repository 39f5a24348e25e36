//! Persistent tree values with structural sharing.

use crate::error::Result;
use crate::state::path::JsonPath;
use crate::types::StateValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A JSON-shaped value whose composite nodes are reference counted.
///
/// Cloning a `Tree` never copies a composite node, so an unchanged subtree
/// keeps its identity across state transitions. `PartialEq` is deep
/// equality; use [`same`](StateValue::same) for identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Tree {
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Tree>>),
    Object(Arc<BTreeMap<String, Tree>>),
}

impl Tree {
    /// An object with no members.
    pub fn empty_object() -> Self {
        Tree::Object(Arc::new(BTreeMap::new()))
    }

    /// Build an object from `(key, value)` pairs.
    pub fn object<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Tree)>,
    {
        Tree::Object(Arc::new(
            members.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build an array from its items.
    pub fn array<I: IntoIterator<Item = Tree>>(items: I) -> Self {
        Tree::Array(Arc::new(items.into_iter().collect()))
    }

    /// Whether this node is an object or array.
    pub fn is_container(&self) -> bool {
        matches!(self, Tree::Array(_) | Tree::Object(_))
    }

    /// Member lookup on objects. `None` for other shapes.
    pub fn get(&self, key: &str) -> Option<&Tree> {
        match self {
            Tree::Object(members) => members.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tree::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// First value matched by `path`, or `None` when nothing matches.
    pub fn value_at(&self, path: &str) -> Result<Option<Tree>> {
        JsonPath::parse(path)?.value(self)
    }

    /// A copy of this tree with `value` stored at `path`.
    ///
    /// Only the nodes along `path` are copied; every other subtree is shared
    /// with `self`.
    pub fn assign(&self, path: &str, value: Tree) -> Result<Tree> {
        JsonPath::parse(path)?.assign(self, value)
    }
}

impl StateValue for Tree {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Tree::Null, Tree::Null) => true,
            (Tree::Bool(a), Tree::Bool(b)) => a == b,
            (Tree::Number(a), Tree::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) if a.is_f64() || b.is_f64() => x == y,
                _ => a == b,
            },
            (Tree::String(a), Tree::String(b)) => a == b,
            (Tree::Array(a), Tree::Array(b)) => Arc::ptr_eq(a, b),
            (Tree::Object(a), Tree::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn as_tree(&self) -> Option<&Tree> {
        Some(self)
    }

    fn kind(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "boolean",
            Tree::Number(_) => "number",
            Tree::String(_) => "string",
            Tree::Array(_) => "array",
            Tree::Object(_) => "object",
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::Null
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Number(n) => Tree::Number(n),
            Value::String(s) => Tree::String(s.into()),
            Value::Array(items) => Tree::array(items.into_iter().map(Tree::from)),
            Value::Object(members) => {
                Tree::object(members.into_iter().map(|(k, v)| (k, Tree::from(v))))
            }
        }
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        match tree {
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(b),
            Tree::Number(n) => Value::Number(n),
            Tree::String(s) => Value::String(s.to_string()),
            Tree::Array(items) => Value::Array(items.iter().cloned().map(Value::from).collect()),
            Tree::Object(members) => Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::String(s.into())
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::String(s.into())
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Bool(b)
    }
}

impl From<i64> for Tree {
    fn from(n: i64) -> Self {
        Tree::Number(n.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clone_preserves_identity() {
        let tree = Tree::from(json!({"a": {"b": 1}}));
        let copy = tree.clone();

        assert!(tree.same(&copy));
        assert!(tree.get("a").unwrap().same(copy.get("a").unwrap()));
    }

    #[test]
    fn test_equal_but_distinct_composites_are_not_same() {
        let a = Tree::from(json!({"x": [1, 2]}));
        let b = Tree::from(json!({"x": [1, 2]}));

        assert_eq!(a, b);
        assert!(!a.same(&b));
        assert!(Tree::from("x").same(&Tree::from("x")));
        assert!(Tree::from(1_i64).same(&Tree::from(json!(1))));
    }

    #[test]
    fn test_assign_shares_untouched_subtrees() {
        let tree = Tree::from(json!({"a": {"b": {"c": 1}}, "d": {"e": 2}}));
        let next = tree.assign("$.a.b.c", Tree::from(5_i64)).unwrap();

        assert!(!tree.same(&next));
        assert!(!tree.get("a").unwrap().same(next.get("a").unwrap()));
        assert!(tree.get("d").unwrap().same(next.get("d").unwrap()));
        assert_eq!(next.value_at("$.a.b.c").unwrap(), Some(Tree::from(5_i64)));
        assert_eq!(tree.value_at("$.a.b.c").unwrap(), Some(Tree::from(1_i64)));
    }

    #[test]
    fn test_json_round_trip() {
        let value = json!({"list": [1, "two", null, true], "nested": {"k": 1.5}});
        let tree: Tree = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(serde_json::to_value(&tree).unwrap(), value);
    }
}
