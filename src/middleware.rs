//! Dispatch middleware.
//!
//! A middleware sits between a caller's `dispatch` and the store it wraps.
//! It can forward an action unchanged, forward a different action, or drop
//! it by not calling `next`.

use crate::error::Result;
use crate::store::{Reducer, Store, StoreEnhancer};
use crate::subscriptions::{Filter, FilteredSubscribe};
use crate::types::{Listener, SubscriptionHandle};
use std::sync::Arc;

/// What a middleware sees while handling one action.
pub struct MiddlewareContext<'a, S, A> {
    get_state: &'a dyn Fn() -> S,
    next: &'a dyn Fn(A) -> Result<()>,
}

impl<'a, S, A> MiddlewareContext<'a, S, A> {
    /// Current state of the wrapped store.
    pub fn state(&self) -> S {
        (self.get_state)()
    }

    /// Pass `action` to the rest of the chain.
    pub fn next(&self, action: A) -> Result<()> {
        (self.next)(action)
    }
}

pub trait Middleware<S, A>: Send + Sync {
    fn handle(&self, ctx: &MiddlewareContext<'_, S, A>, action: A) -> Result<()>;
}

/// Store wrapped by a middleware chain. The first middleware in the chain
/// sees each action first.
pub struct MiddlewareStore<T: Store> {
    inner: T,
    chain: Vec<Arc<dyn Middleware<T::State, T::Action>>>,
}

impl<T: Store> MiddlewareStore<T> {
    pub fn new(inner: T, chain: Vec<Arc<dyn Middleware<T::State, T::Action>>>) -> Self {
        Self { inner, chain }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn run(&self, index: usize, action: T::Action) -> Result<()> {
        let Some(middleware) = self.chain.get(index) else {
            return self.inner.dispatch(action);
        };

        let get_state = || self.inner.get_state();
        let next = |action: T::Action| self.run(index + 1, action);
        let ctx = MiddlewareContext {
            get_state: &get_state,
            next: &next,
        };
        middleware.handle(&ctx, action)
    }
}

impl<T: Store> Store for MiddlewareStore<T> {
    type State = T::State;
    type Action = T::Action;

    fn get_state(&self) -> Self::State {
        self.inner.get_state()
    }

    fn dispatch(&self, action: Self::Action) -> Result<()> {
        self.run(0, action)
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionHandle {
        self.inner.subscribe(listener)
    }

    fn replace_reducer(&self, reducer: Reducer<Self::State, Self::Action>) {
        self.inner.replace_reducer(reducer)
    }
}

impl<T: FilteredSubscribe> FilteredSubscribe for MiddlewareStore<T> {
    fn subscribe_filtered<L, F>(&self, listener: L, filter: F) -> Result<SubscriptionHandle>
    where
        L: Fn(&Self::State, Option<&Self::Action>) + Send + Sync + 'static,
        F: Into<Filter<Self::State>>,
    {
        self.inner.subscribe_filtered(listener, filter)
    }
}

/// Enhancer that wraps a store in a middleware chain.
pub struct ApplyMiddleware<S, A> {
    chain: Vec<Arc<dyn Middleware<S, A>>>,
}

/// Build an enhancer from `chain`; the first entry is outermost.
pub fn apply_middleware<S, A>(chain: Vec<Arc<dyn Middleware<S, A>>>) -> ApplyMiddleware<S, A> {
    ApplyMiddleware { chain }
}

impl<T: Store> StoreEnhancer<T> for ApplyMiddleware<T::State, T::Action> {
    type Output = MiddlewareStore<T>;

    fn enhance(self, store: T) -> Self::Output {
        MiddlewareStore::new(store, self.chain)
    }
}
