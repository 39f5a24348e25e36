//! JSONPath-style queries over [`Tree`] values.
//!
//! Supported syntax:
//! - `$` (or the empty string) for the root
//! - `.name`, `['name']`, `["name"]` for object members
//! - `[n]` for array items, negative `n` counting from the end
//! - `.*`, `[*]` for every child
//! - `..name`, `..*`, `..[...]` for recursive descent
//!
//! Evaluation never mutates its input. Assignment copies only the nodes
//! along a definite path and shares everything else.

use crate::error::{Result, StoreError};
use crate::state::tree::Tree;
use crate::types::StateValue;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of parsed paths kept by [`JsonPathEvaluator`].
pub const DEFAULT_PATH_CACHE_SIZE: usize = 64;

/// Path capability consumed by path filters.
///
/// Implementations must not mutate the trees they are given; path filters
/// compare the returned nodes by identity.
pub trait PathEvaluator: Send + Sync {
    /// Validate `path` without evaluating it.
    fn check(&self, path: &str) -> Result<()>;

    /// First node matched by `path`, or `None` when nothing matches.
    fn evaluate(&self, tree: &Tree, path: &str) -> Result<Option<Tree>>;

    /// A copy of `tree` with `value` stored at `path`.
    fn assign(&self, tree: &Tree, path: &str, value: Tree) -> Result<Tree>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Selector {
    Key(String),
    Index(i64),
    Wildcard,
}

impl Selector {
    fn select<'t>(&self, node: &'t Tree, out: &mut Vec<&'t Tree>) {
        match (self, node) {
            (Selector::Key(key), Tree::Object(members)) => out.extend(members.get(key.as_str())),
            (Selector::Index(index), Tree::Array(items)) => {
                if let Some(position) = resolve_index(*index, items.len()) {
                    out.push(&items[position]);
                }
            }
            (Selector::Wildcard, Tree::Object(members)) => out.extend(members.values()),
            (Selector::Wildcard, Tree::Array(items)) => out.extend(items.iter()),
            _ => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Segment {
    selector: Selector,
    /// `..` segment: applies to the node and all of its descendants.
    descendant: bool,
}

impl Segment {
    fn is_definite(&self) -> bool {
        !self.descendant && self.selector != Selector::Wildcard
    }
}

/// A parsed path expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path expression.
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        let segments = if trimmed.is_empty() {
            Vec::new()
        } else {
            Parser::new(source, trimmed).parse()?
        };

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The text this path was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this path selects the root itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this path selects at most one location.
    pub fn is_definite(&self) -> bool {
        self.segments.iter().all(Segment::is_definite)
    }

    /// Every node matched by this path, in document order.
    pub fn query<'t>(&self, root: &'t Tree) -> Result<Vec<&'t Tree>> {
        if !root.is_container() {
            return Err(StoreError::NotATree {
                path: self.source.clone(),
                kind: root.kind(),
            });
        }

        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                if segment.descendant {
                    let mut scope = Vec::new();
                    collect_descendants(node, &mut scope);
                    for inner in scope {
                        segment.selector.select(inner, &mut next);
                    }
                } else {
                    segment.selector.select(node, &mut next);
                }
            }
            if next.is_empty() {
                return Ok(next);
            }
            current = next;
        }
        Ok(current)
    }

    /// First node matched by this path, or `None` when nothing matches.
    pub fn value(&self, root: &Tree) -> Result<Option<Tree>> {
        Ok(self.query(root)?.first().map(|node| (*node).clone()))
    }

    /// A copy of `root` with `value` stored at this path.
    ///
    /// Missing intermediate members are created as empty objects.
    pub fn assign(&self, root: &Tree, value: Tree) -> Result<Tree> {
        if !self.is_definite() {
            return Err(self.assign_error("path does not select a single location"));
        }
        self.assign_at(root, &self.segments, value)
    }

    fn assign_at(&self, node: &Tree, segments: &[Segment], value: Tree) -> Result<Tree> {
        let Some((segment, rest)) = segments.split_first() else {
            return Ok(value);
        };

        match (&segment.selector, node) {
            (Selector::Key(key), Tree::Object(members)) => {
                let child = members
                    .get(key.as_str())
                    .cloned()
                    .unwrap_or_else(Tree::empty_object);
                let replaced = self.assign_at(&child, rest, value)?;

                let mut next = (**members).clone();
                next.insert(key.clone(), replaced);
                Ok(Tree::Object(Arc::new(next)))
            }
            (Selector::Index(index), Tree::Array(items)) => {
                let position = resolve_index(*index, items.len()).ok_or_else(|| {
                    self.assign_error(&format!(
                        "index {} out of bounds (len {})",
                        index,
                        items.len()
                    ))
                })?;
                let replaced = self.assign_at(&items[position], rest, value)?;

                let mut next = (**items).clone();
                next[position] = replaced;
                Ok(Tree::Array(Arc::new(next)))
            }
            (Selector::Key(key), other) => Err(self.assign_error(&format!(
                "cannot set member {:?} on a {}",
                key,
                other.kind()
            ))),
            (Selector::Index(index), other) => Err(self.assign_error(&format!(
                "cannot set index {} on a {}",
                index,
                other.kind()
            ))),
            (Selector::Wildcard, _) => {
                Err(self.assign_error("path does not select a single location"))
            }
        }
    }

    fn assign_error(&self, reason: &str) -> StoreError {
        StoreError::Assign {
            path: self.source.clone(),
            reason: reason.to_string(),
        }
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let position = usize::try_from(index).ok()?;
        (position < len).then_some(position)
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

/// Pre-order walk: the node itself, then each child subtree in order.
fn collect_descendants<'t>(node: &'t Tree, out: &mut Vec<&'t Tree>) {
    out.push(node);
    match node {
        Tree::Array(items) => {
            for item in items.iter() {
                collect_descendants(item, out);
            }
        }
        Tree::Object(members) => {
            for member in members.values() {
                collect_descendants(member, out);
            }
        }
        _ => {}
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, trimmed: &str) -> Self {
        Self {
            source,
            chars: trimmed.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>> {
        if !self.eat('$') {
            return Err(self.error("expected '$' at the start of the path"));
        }

        let mut segments = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    let descendant = self.eat('.');
                    let selector = if self.eat('[') {
                        if !descendant {
                            return Err(self.error("unexpected '[' after '.'"));
                        }
                        self.bracket()?
                    } else if self.eat('*') {
                        Selector::Wildcard
                    } else {
                        Selector::Key(self.name()?)
                    };
                    segments.push(Segment {
                        selector,
                        descendant,
                    });
                }
                '[' => {
                    self.pos += 1;
                    segments.push(Segment {
                        selector: self.bracket()?,
                        descendant: false,
                    });
                }
                other => return Err(self.error(&format!("unexpected character {:?}", other))),
            }
        }
        Ok(segments)
    }

    /// Member name in dot notation.
    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' || c == ']' || c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a member name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Selector inside brackets; the opening '[' is already consumed.
    fn bracket(&mut self) -> Result<Selector> {
        self.skip_whitespace();
        let selector = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                Selector::Key(self.quoted(quote)?)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Selector::Index(self.integer()?),
            _ => return Err(self.error("expected an index, a quoted name or '*'")),
        };
        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(selector)
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated quoted name")),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn integer(&mut self) -> Result<i64> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.error(&format!("invalid array index {:?}", text)))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> StoreError {
        StoreError::InvalidPath {
            path: self.source.to_string(),
            reason: format!("{} at offset {}", reason, self.pos),
        }
    }
}

/// Default [`PathEvaluator`]: parses each distinct path once and keeps the
/// most recently used ones.
pub struct JsonPathEvaluator {
    cache: Mutex<LruCache<String, Arc<JsonPath>>>,
}

impl JsonPathEvaluator {
    pub fn new(cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// Parsed form of `path`, from cache when possible.
    pub fn compile(&self, path: &str) -> Result<Arc<JsonPath>> {
        if let Some(parsed) = self.cache.lock().get(path) {
            return Ok(Arc::clone(parsed));
        }

        let parsed = Arc::new(JsonPath::parse(path)?);
        self.cache.lock().put(path.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Number of parsed paths currently cached.
    pub fn cached_paths(&self) -> usize {
        self.cache.lock().len()
    }
}

impl Default for JsonPathEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_CACHE_SIZE)
    }
}

impl PathEvaluator for JsonPathEvaluator {
    fn check(&self, path: &str) -> Result<()> {
        self.compile(path).map(|_| ())
    }

    fn evaluate(&self, tree: &Tree, path: &str) -> Result<Option<Tree>> {
        self.compile(path)?.value(tree)
    }

    fn assign(&self, tree: &Tree, path: &str, value: Tree) -> Result<Tree> {
        self.compile(path)?.assign(tree, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Tree {
        Tree::from(json!({
            "store": {
                "book": [
                    {"title": "Sayings", "price": 8},
                    {"title": "Sword", "price": 12},
                    {"title": "Moby", "price": 9}
                ],
                "bicycle": {"color": "red", "price": 19}
            },
            "odd key": {"x": 1}
        }))
    }

    #[test]
    fn test_parse_forms() {
        for path in [
            "",
            "$",
            "$.store.book",
            "$['store'][\"book\"][0]",
            "$.store.book[-1]",
            "$.store.*",
            "$..price",
            "$..[0]",
            "$[ 'odd key' ].x",
        ] {
            assert!(JsonPath::parse(path).is_ok(), "failed to parse {:?}", path);
        }
    }

    #[test]
    fn test_parse_errors() {
        for path in ["store", "$.", "$[", "$['open", "$[abc]", "$.a[0", "$.[0]", "$ x"] {
            let result = JsonPath::parse(path);
            assert!(
                matches!(result, Err(StoreError::InvalidPath { .. })),
                "expected error for {:?}, got {:?}",
                path,
                result
            );
        }
    }

    #[test]
    fn test_value_lookup() {
        let tree = sample();

        let title = JsonPath::parse("$.store.book[1].title").unwrap().value(&tree).unwrap();
        assert_eq!(title, Some(Tree::from("Sword")));

        let last = JsonPath::parse("$.store.book[-1].title").unwrap().value(&tree).unwrap();
        assert_eq!(last, Some(Tree::from("Moby")));

        let quoted = JsonPath::parse("$['odd key'].x").unwrap().value(&tree).unwrap();
        assert_eq!(quoted, Some(Tree::from(1_i64)));

        let missing = JsonPath::parse("$.store.book[7]").unwrap().value(&tree).unwrap();
        assert_eq!(missing, None);

        let through_scalar = JsonPath::parse("$.store.bicycle.color.x").unwrap().value(&tree).unwrap();
        assert_eq!(through_scalar, None);
    }

    #[test]
    fn test_root_value_is_the_tree_itself() {
        let tree = sample();
        for path in ["", "$"] {
            let root = JsonPath::parse(path).unwrap().value(&tree).unwrap().unwrap();
            assert!(root.same(&tree));
        }
    }

    #[test]
    fn test_wildcard_and_descent_order() {
        let tree = sample();

        let prices: Vec<i64> = JsonPath::parse("$..price")
            .unwrap()
            .query(&tree)
            .unwrap()
            .into_iter()
            .filter_map(Tree::as_i64)
            .collect();
        assert_eq!(prices, vec![19, 8, 12, 9]);

        let first = JsonPath::parse("$.store.book[*].title").unwrap().value(&tree).unwrap();
        assert_eq!(first, Some(Tree::from("Sayings")));
    }

    #[test]
    fn test_query_requires_container_root() {
        let result = JsonPath::parse("$").unwrap().value(&Tree::from("hello world"));
        assert!(matches!(result, Err(StoreError::NotATree { kind: "string", .. })));
    }

    #[test]
    fn test_assign_creates_missing_members() {
        let tree = Tree::from(json!({"a": {}}));
        let next = JsonPath::parse("$.a.b.c").unwrap().assign(&tree, Tree::from(true)).unwrap();

        assert_eq!(next, Tree::from(json!({"a": {"b": {"c": true}}})));
        assert_eq!(tree, Tree::from(json!({"a": {}})));
    }

    #[test]
    fn test_assign_root_replaces_tree() {
        let tree = sample();
        let replacement = Tree::from(json!({"hello": "world"}));
        let next = JsonPath::parse("$").unwrap().assign(&tree, replacement.clone()).unwrap();

        assert!(next.same(&replacement));
    }

    #[test]
    fn test_assign_rejects_indefinite_and_invalid_targets() {
        let tree = sample();

        let wildcard = JsonPath::parse("$.store.*").unwrap().assign(&tree, Tree::Null);
        assert!(matches!(wildcard, Err(StoreError::Assign { .. })));

        let descent = JsonPath::parse("$..price").unwrap().assign(&tree, Tree::Null);
        assert!(matches!(descent, Err(StoreError::Assign { .. })));

        let out_of_bounds = JsonPath::parse("$.store.book[3]").unwrap().assign(&tree, Tree::Null);
        assert!(matches!(out_of_bounds, Err(StoreError::Assign { .. })));

        let through_scalar =
            JsonPath::parse("$.store.bicycle.color.x").unwrap().assign(&tree, Tree::Null);
        assert!(matches!(through_scalar, Err(StoreError::Assign { .. })));
    }

    #[test]
    fn test_evaluator_caches_parsed_paths() {
        let evaluator = JsonPathEvaluator::new(2);
        let tree = sample();

        evaluator.evaluate(&tree, "$.store").unwrap();
        evaluator.evaluate(&tree, "$.store").unwrap();
        assert_eq!(evaluator.cached_paths(), 1);

        evaluator.check("$.a").unwrap();
        evaluator.check("$.b").unwrap();
        assert_eq!(evaluator.cached_paths(), 2);

        assert!(evaluator.check("nope").is_err());
        assert_eq!(evaluator.cached_paths(), 2);
    }
}
