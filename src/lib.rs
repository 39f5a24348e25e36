//! # Filtered Store
//!
//! Filtered subscriptions for unidirectional state stores.
//!
//! ## Core Concepts
//!
//! - **Store**: holds state, applies actions through a reducer, notifies listeners
//! - **Middleware**: intercepts dispatch to forward, transform or drop actions
//! - **Filtered store**: records each dispatch and only notifies a listener
//!   when its filter judges the change relevant
//! - **Tree**: structurally shared JSON-like state that path filters query
//!
//! ## Example
//!
//! ```ignore
//! use filtered_store::{create_store, FilteredStore, FilteredSubscribe, Store, Tree};
//!
//! let store = FilteredStore::new(create_store(
//!     |state: &Tree, action: &Action| match action {
//!         Action::Rename(name) => state.assign("$.user.name", name.as_str().into()),
//!         Action::Noop => Ok(state.clone()),
//!     },
//!     Tree::from(serde_json::json!({"user": {"name": "ada"}})),
//! ));
//!
//! // Called only when `$.user` is replaced
//! store.subscribe_filtered(|state, action| println!("{:?} {:?}", state, action), "$.user")?;
//!
//! // Called only when the whole state changes identity
//! store.subscribe_filtered(|state, _| println!("{:?}", state), true)?;
//!
//! store.dispatch(Action::Rename("grace".into()))?;
//! ```

pub mod error;
pub mod middleware;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use middleware::{
    apply_middleware, ApplyMiddleware, Middleware, MiddlewareContext, MiddlewareStore,
};
pub use state::{JsonPath, JsonPathEvaluator, PathEvaluator, Tree, DEFAULT_PATH_CACHE_SIZE};
pub use store::{create_store, BaseStore, Reducer, Store, StoreEnhancer, StoreExt};
pub use subscriptions::{
    enhance, EnhancerConfig, Filter, FilterEnhancer, FilteredStore, FilteredSubscribe,
    Notification, NotificationStream, Predicate, ReentrancyPolicy, ResolvedFilter,
};
pub use types::{Listener, StateValue, SubscriptionHandle, SubscriptionId};
