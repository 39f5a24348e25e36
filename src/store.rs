//! Store capability and the base reducer store.

use crate::error::Result;
use crate::types::{Listener, StateValue, SubscriptionHandle, SubscriptionId};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Pure state transition. Returns the next state, or an error to reject the
/// action without changing state or notifying anyone.
pub type Reducer<S, A> = Arc<dyn Fn(&S, &A) -> Result<S> + Send + Sync>;

/// The store contract every layer implements.
///
/// Layers wrap one another; each forwards what it does not change.
pub trait Store: Send + Sync {
    type State: StateValue;
    type Action: Clone + Send + Sync + 'static;

    /// Current state.
    fn get_state(&self) -> Self::State;

    /// Apply `action` and notify listeners before returning.
    fn dispatch(&self, action: Self::Action) -> Result<()>;

    /// Register a listener called after every dispatch.
    fn subscribe(&self, listener: Listener) -> SubscriptionHandle;

    /// Swap the reducer used by subsequent dispatches.
    fn replace_reducer(&self, reducer: Reducer<Self::State, Self::Action>);
}

/// A layer that wraps a store and returns a store over the same state and
/// actions.
pub trait StoreEnhancer<T: Store> {
    type Output: Store<State = T::State, Action = T::Action>;

    fn enhance(self, store: T) -> Self::Output;
}

/// Composition helper: `store.with_enhancer(a).with_enhancer(b)` makes `b`
/// the outermost layer.
pub trait StoreExt: Store + Sized {
    fn with_enhancer<E: StoreEnhancer<Self>>(self, enhancer: E) -> E::Output {
        enhancer.enhance(self)
    }
}

impl<T: Store> StoreExt for T {}

type ListenerList = RwLock<Vec<(SubscriptionId, Listener)>>;

/// Reducer-driven store holding the current state.
///
/// Dispatch runs the reducer, stores the result and then calls a snapshot of
/// the registered listeners in registration order. Listeners added or
/// removed during a notification take effect from the next dispatch.
pub struct BaseStore<S, A> {
    reducer: RwLock<Reducer<S, A>>,
    state: RwLock<S>,
    listeners: Arc<ListenerList>,
    next_id: AtomicU64,
}

/// Create a base store with `initial` as its state.
pub fn create_store<S, A, R>(reducer: R, initial: S) -> BaseStore<S, A>
where
    S: StateValue,
    A: Clone + Send + Sync + 'static,
    R: Fn(&S, &A) -> Result<S> + Send + Sync + 'static,
{
    BaseStore::new(Arc::new(reducer), initial)
}

impl<S, A> BaseStore<S, A>
where
    S: StateValue,
    A: Clone + Send + Sync + 'static,
{
    pub fn new(reducer: Reducer<S, A>, initial: S) -> Self {
        Self {
            reducer: RwLock::new(reducer),
            state: RwLock::new(initial),
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl<S, A> Store for BaseStore<S, A>
where
    S: StateValue,
    A: Clone + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn get_state(&self) -> S {
        self.state.read().clone()
    }

    fn dispatch(&self, action: A) -> Result<()> {
        let reducer = Arc::clone(&*self.reducer.read());
        {
            let mut state = self.state.write();
            let next = reducer(&*state, &action)?;
            *state = next;
        }

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(listeners = listeners.len(), "notifying listeners");

        for listener in listeners {
            listener()?;
        }
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, listener));

        let registry: Weak<ListenerList> = Arc::downgrade(&self.listeners);
        SubscriptionHandle::new(id, move || {
            if let Some(registry) = registry.upgrade() {
                registry.write().retain(|(existing, _)| *existing != id);
            }
        })
    }

    fn replace_reducer(&self, reducer: Reducer<S, A>) {
        *self.reducer.write() = reducer;
    }
}
