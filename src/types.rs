//! Core types shared by stores, middleware and filtered subscriptions.

use crate::error::Result;
use crate::state::Tree;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a subscription within one store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A store-level listener. Called after every dispatch that reached the
/// reducer; an error stops the notification cascade and is returned from
/// `dispatch`.
pub type Listener = Arc<dyn Fn() -> Result<()> + Send + Sync>;

type UnsubscribeFn = Box<dyn FnOnce() + Send + Sync>;

/// Handle to a registered listener.
///
/// Dropping the handle does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    unsubscribe: Option<UnsubscribeFn>,
}

impl SubscriptionHandle {
    pub fn new(id: SubscriptionId, unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Remove the listener from its store. Calling this more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Whether `unsubscribe` has not been called yet.
    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A value that can be held as store state.
///
/// `same` is an identity comparison, not deep equality: plain values compare
/// by value, shared values (`Arc`, tree composites) compare by pointer.
/// Filters built on it are only meaningful when reducers return a new value
/// whenever anything inside the state changed.
pub trait StateValue: Clone + Send + Sync + 'static {
    fn same(&self, other: &Self) -> bool;

    /// Tree view used by path filters. Non-tree states return `None`.
    fn as_tree(&self) -> Option<&Tree> {
        None
    }

    /// Short name of the value's shape, used in error messages.
    fn kind(&self) -> &'static str {
        "opaque"
    }
}

macro_rules! impl_state_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StateValue for $ty {
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_state_value_by_eq!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str,
);

impl<T: ?Sized + Send + Sync + 'static> StateValue for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: StateValue> StateValue for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}
