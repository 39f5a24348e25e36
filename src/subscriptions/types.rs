//! Filter and configuration types for filtered subscriptions.

use crate::state::{PathEvaluator, DEFAULT_PATH_CACHE_SIZE};
use crate::types::SubscriptionHandle;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Caller-supplied change test. Receives the state captured before the
/// current dispatch (`None` if no dispatch went through the filtering layer
/// yet) and the state after it. Returning `true` suppresses the
/// notification.
pub type Predicate<S> = Arc<dyn Fn(Option<&S>, &S) -> bool + Send + Sync>;

/// Decides, per notification, whether a listener hears about a change.
pub enum Filter<S> {
    /// Always notify.
    None,
    /// Notify unless old and new state are the same value.
    Identity,
    /// Notify unless the value at this path is the same before and after.
    Path(String),
    /// Notify unless the predicate returns `true`.
    Predicate(Predicate<S>),
}

impl<S> Filter<S> {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&S>, &S) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Arc::new(f))
    }

    pub fn path(path: impl Into<String>) -> Self {
        Filter::Path(path.into())
    }

    /// Name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Identity => "identity",
            Filter::Path(_) => "path",
            Filter::Predicate(_) => "predicate",
        }
    }
}

impl<S> Default for Filter<S> {
    fn default() -> Self {
        Filter::None
    }
}

impl<S> Clone for Filter<S> {
    fn clone(&self) -> Self {
        match self {
            Filter::None => Filter::None,
            Filter::Identity => Filter::Identity,
            Filter::Path(path) => Filter::Path(path.clone()),
            Filter::Predicate(predicate) => Filter::Predicate(Arc::clone(predicate)),
        }
    }
}

impl<S> fmt::Debug for Filter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::None => write!(f, "Filter::None"),
            Filter::Identity => write!(f, "Filter::Identity"),
            Filter::Path(path) => write!(f, "Filter::Path({:?})", path),
            Filter::Predicate(_) => write!(f, "Filter::Predicate(..)"),
        }
    }
}

/// `true` filters by identity, `false` does not filter.
impl<S> From<bool> for Filter<S> {
    fn from(identity: bool) -> Self {
        if identity {
            Filter::Identity
        } else {
            Filter::None
        }
    }
}

/// A non-blank string is a path expression; an empty or all-whitespace
/// string does not filter.
impl<S> From<&str> for Filter<S> {
    fn from(path: &str) -> Self {
        if path.trim().is_empty() {
            Filter::None
        } else {
            Filter::Path(path.to_string())
        }
    }
}

impl<S> From<String> for Filter<S> {
    fn from(path: String) -> Self {
        if path.trim().is_empty() {
            Filter::None
        } else {
            Filter::Path(path)
        }
    }
}

impl<S> From<Predicate<S>> for Filter<S> {
    fn from(predicate: Predicate<S>) -> Self {
        Filter::Predicate(predicate)
    }
}

/// What a filtered store does when a listener dispatches while a dispatch
/// is still notifying.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReentrancyPolicy {
    /// Fail the nested dispatch with `StoreError::ReentrantDispatch`.
    #[default]
    Reject,
    /// Run the nested dispatch. It overwrites the recorded action and
    /// pre-dispatch state, so listeners of the outer dispatch that run after
    /// it see the nested pair.
    Allow,
}

/// Configuration for a filtered store.
#[derive(Clone)]
pub struct EnhancerConfig {
    /// Default: `Reject`
    pub reentrancy: ReentrancyPolicy,

    /// Parsed paths kept by the default evaluator.
    /// Default: 64
    pub path_cache_size: usize,

    /// Path capability used by path filters (None = `JsonPathEvaluator`).
    pub evaluator: Option<Arc<dyn PathEvaluator>>,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            reentrancy: ReentrancyPolicy::default(),
            path_cache_size: DEFAULT_PATH_CACHE_SIZE,
            evaluator: None,
        }
    }
}

impl fmt::Debug for EnhancerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancerConfig")
            .field("reentrancy", &self.reentrancy)
            .field("path_cache_size", &self.path_cache_size)
            .field("custom_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

/// A notification delivered through a channel subscription.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification<S, A> {
    pub state: S,
    pub action: Option<A>,
}

/// Channel-backed subscription.
pub struct NotificationStream<S, A> {
    pub handle: SubscriptionHandle,
    /// Channel to receive notifications.
    pub receiver: crossbeam_channel::Receiver<Notification<S, A>>,
}

impl<S, A> NotificationStream<S, A> {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<Notification<S, A>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<Notification<S, A>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Notification<S, A>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Stop delivery. Notifications already buffered stay readable.
    pub fn unsubscribe(&mut self) {
        self.handle.unsubscribe();
    }
}
