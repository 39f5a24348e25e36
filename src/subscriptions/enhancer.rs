//! The filtering layer: records each dispatch and gates listeners.

use crate::error::{Result, StoreError};
use crate::state::{JsonPathEvaluator, PathEvaluator};
use crate::store::{Reducer, Store, StoreEnhancer};
use crate::types::{Listener, SubscriptionHandle};
use crossbeam_channel::{bounded, TrySendError};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::filter::ResolvedFilter;
use super::types::{
    EnhancerConfig, Filter, Notification, NotificationStream, ReentrancyPolicy,
};

/// Stores that can register listeners behind a [`Filter`].
pub trait FilteredSubscribe: Store {
    /// Register `listener`, called with the new state and the dispatched
    /// action whenever `filter` does not suppress the change.
    ///
    /// The filter is resolved once, here. A malformed path expression is
    /// reported as `StoreError::InvalidPath`.
    fn subscribe_filtered<L, F>(&self, listener: L, filter: F) -> Result<SubscriptionHandle>
    where
        L: Fn(&Self::State, Option<&Self::Action>) + Send + Sync + 'static,
        F: Into<Filter<Self::State>>;

    /// Deliver unsuppressed notifications into a bounded channel.
    ///
    /// When the buffer is full the notification is dropped.
    fn subscribe_channel<F>(
        &self,
        filter: F,
        buffer_size: usize,
    ) -> Result<NotificationStream<Self::State, Self::Action>>
    where
        F: Into<Filter<Self::State>>,
    {
        let (sender, receiver) = bounded(buffer_size);
        let handle = self.subscribe_filtered(
            move |state: &Self::State, action: Option<&Self::Action>| {
                let notification = Notification {
                    state: state.clone(),
                    action: action.cloned(),
                };
                match sender.try_send(notification) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("notification buffer full, dropping notification")
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        trace!("notification receiver dropped")
                    }
                }
            },
            filter,
        )?;
        Ok(NotificationStream { handle, receiver })
    }
}

/// What the most recent dispatch looked like from the filtering layer.
struct Tracking<S, A> {
    last_action: Option<A>,
    state_before_last_action: Option<S>,
    /// Dispatches currently in progress through this layer.
    depth: usize,
}

/// Store wrapper adding filtered subscriptions.
///
/// `dispatch` records the action and the state just before it, then
/// delegates. Listeners registered through
/// [`subscribe_filtered`](FilteredSubscribe::subscribe_filtered) compare that
/// recorded state with the state at notification time. Because the inner
/// store notifies synchronously inside its own `dispatch`, every notification
/// sees the pair belonging to the dispatch that caused it.
///
/// Dispatches from different threads run one at a time; a thread waits
/// until the dispatch in progress has notified every listener. A listener
/// must not block on another thread that dispatches into the same store.
///
/// Identity-based filters assume reducers return a new value (or new
/// subtree) whenever something inside it changed, and never mutate in place.
pub struct FilteredStore<T: Store> {
    inner: Arc<T>,
    /// Held for the whole of each dispatch. Re-acquired on the owning thread
    /// only by a listener dispatching again.
    dispatch_lock: ReentrantMutex<()>,
    tracking: Arc<Mutex<Tracking<T::State, T::Action>>>,
    evaluator: Arc<dyn PathEvaluator>,
    config: EnhancerConfig,
}

impl<T: Store> FilteredStore<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, EnhancerConfig::default())
    }

    pub fn with_config(inner: T, config: EnhancerConfig) -> Self {
        let evaluator = config.evaluator.clone().unwrap_or_else(|| {
            Arc::new(JsonPathEvaluator::new(config.path_cache_size)) as Arc<dyn PathEvaluator>
        });

        Self {
            inner: Arc::new(inner),
            dispatch_lock: ReentrantMutex::new(()),
            tracking: Arc::new(Mutex::new(Tracking {
                last_action: None,
                state_before_last_action: None,
                depth: 0,
            })),
            evaluator,
            config,
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Most recent action passed to `dispatch`, including one that failed.
    pub fn last_action(&self) -> Option<T::Action> {
        self.tracking.lock().last_action.clone()
    }

    /// State captured immediately before the most recent `dispatch`.
    pub fn state_before_last_action(&self) -> Option<T::State> {
        self.tracking.lock().state_before_last_action.clone()
    }
}

/// Marks a dispatch as finished, including when it returns an error.
struct DispatchGuard<'a, S, A>(&'a Mutex<Tracking<S, A>>);

impl<S, A> Drop for DispatchGuard<'_, S, A> {
    fn drop(&mut self) {
        let mut tracking = self.0.lock();
        tracking.depth = tracking.depth.saturating_sub(1);
    }
}

impl<T: Store> Store for FilteredStore<T> {
    type State = T::State;
    type Action = T::Action;

    fn get_state(&self) -> Self::State {
        self.inner.get_state()
    }

    fn dispatch(&self, action: Self::Action) -> Result<()> {
        // Only this thread can be inside a dispatch once the lock is held, so
        // a non-zero depth means a listener dispatched again.
        let _serial = self.dispatch_lock.lock();
        {
            let mut tracking = self.tracking.lock();
            if tracking.depth > 0 && self.config.reentrancy == ReentrancyPolicy::Reject {
                debug!(depth = tracking.depth, "rejecting re-entrant dispatch");
                return Err(StoreError::ReentrantDispatch);
            }
            tracking.state_before_last_action = Some(self.inner.get_state());
            tracking.last_action = Some(action.clone());
            tracking.depth += 1;
        }
        let _guard = DispatchGuard(&*self.tracking);

        trace!("dispatching");
        self.inner.dispatch(action)
    }

    /// Unfiltered registration, forwarded to the inner store.
    fn subscribe(&self, listener: Listener) -> SubscriptionHandle {
        self.inner.subscribe(listener)
    }

    fn replace_reducer(&self, reducer: Reducer<Self::State, Self::Action>) {
        self.inner.replace_reducer(reducer)
    }
}

impl<T: Store + 'static> FilteredSubscribe for FilteredStore<T> {
    fn subscribe_filtered<L, F>(&self, listener: L, filter: F) -> Result<SubscriptionHandle>
    where
        L: Fn(&Self::State, Option<&Self::Action>) + Send + Sync + 'static,
        F: Into<Filter<Self::State>>,
    {
        let filter = ResolvedFilter::resolve(filter.into(), &self.evaluator)?;
        debug!(filter = filter.kind(), "registering filtered listener");

        let inner = Arc::downgrade(&self.inner);
        let tracking = Arc::clone(&self.tracking);
        let wrapped: Listener = Arc::new(move || -> Result<()> {
            let Some(inner) = inner.upgrade() else {
                return Ok(());
            };
            let new_state = inner.get_state();
            let (old_state, action) = {
                let tracking = tracking.lock();
                (
                    tracking.state_before_last_action.clone(),
                    tracking.last_action.clone(),
                )
            };

            if filter.suppresses(old_state.as_ref(), &new_state)? {
                trace!(filter = filter.kind(), "notification suppressed");
                return Ok(());
            }
            listener(&new_state, action.as_ref());
            Ok(())
        });

        Ok(self.inner.subscribe(wrapped))
    }
}

/// Enhancer form of [`FilteredStore`], for composing with other layers.
#[derive(Clone, Debug, Default)]
pub struct FilterEnhancer {
    pub config: EnhancerConfig,
}

impl FilterEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }
}

impl<T: Store> StoreEnhancer<T> for FilterEnhancer {
    type Output = FilteredStore<T>;

    fn enhance(self, store: T) -> Self::Output {
        FilteredStore::with_config(store, self.config)
    }
}

/// Turn a store factory into one producing filtered stores.
///
/// ```ignore
/// let make = enhance(|initial| create_store(reducer, initial));
/// let store = make(0);
/// let other = make(10);
/// store.subscribe_filtered(|state, action| println!("{state} {action:?}"), true)?;
/// ```
pub fn enhance<T, F, Args>(factory: F) -> impl Fn(Args) -> FilteredStore<T>
where
    T: Store,
    F: Fn(Args) -> T,
{
    move |args| FilteredStore::new(factory(args))
}
