//! Filter resolution: turns a [`Filter`] into the test run on each
//! notification.

use crate::error::{Result, StoreError};
use crate::state::{PathEvaluator, Tree};
use crate::types::StateValue;
use std::sync::Arc;

use super::types::{Filter, Predicate};

/// A filter resolved once at subscribe time.
pub enum ResolvedFilter<S> {
    Never,
    Identity,
    Path {
        path: String,
        evaluator: Arc<dyn PathEvaluator>,
    },
    Predicate(Predicate<S>),
}

impl<S: StateValue> ResolvedFilter<S> {
    /// Resolve `filter`. Path expressions are validated here, so a malformed
    /// path fails the subscription instead of a later dispatch.
    pub fn resolve(filter: Filter<S>, evaluator: &Arc<dyn PathEvaluator>) -> Result<Self> {
        Ok(match filter {
            Filter::None => ResolvedFilter::Never,
            Filter::Identity => ResolvedFilter::Identity,
            Filter::Path(path) => {
                evaluator.check(&path)?;
                ResolvedFilter::Path {
                    path,
                    evaluator: Arc::clone(evaluator),
                }
            }
            Filter::Predicate(predicate) => ResolvedFilter::Predicate(predicate),
        })
    }

    /// Whether the change from `old` to `new` should not be reported.
    ///
    /// A missing `old` state never matches `new` by identity, and evaluates to
    /// "absent" for path filters.
    pub fn suppresses(&self, old: Option<&S>, new: &S) -> Result<bool> {
        match self {
            ResolvedFilter::Never => Ok(false),
            ResolvedFilter::Identity => Ok(old.is_some_and(|old| old.same(new))),
            ResolvedFilter::Path { path, evaluator } => {
                let before = match old {
                    Some(old) => evaluate(evaluator.as_ref(), old, path)?,
                    None => None,
                };
                let after = evaluate(evaluator.as_ref(), new, path)?;

                Ok(match (before, after) {
                    (None, None) => true,
                    (Some(before), Some(after)) => before.same(&after),
                    _ => false,
                })
            }
            ResolvedFilter::Predicate(predicate) => Ok(predicate(old, new)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedFilter::Never => "none",
            ResolvedFilter::Identity => "identity",
            ResolvedFilter::Path { .. } => "path",
            ResolvedFilter::Predicate(_) => "predicate",
        }
    }
}

fn evaluate<S: StateValue>(
    evaluator: &dyn PathEvaluator,
    state: &S,
    path: &str,
) -> Result<Option<Tree>> {
    let tree = state.as_tree().ok_or_else(|| StoreError::NotATree {
        path: path.to_string(),
        kind: state.kind(),
    })?;
    evaluator.evaluate(tree, path)
}
