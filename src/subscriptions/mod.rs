//! Filtered subscriptions.
//!
//! A [`FilteredStore`] wraps any [`Store`](crate::store::Store) and lets
//! listeners say which changes they care about:
//! - [`Filter::None`]: every dispatch
//! - [`Filter::Identity`]: only when the state value changed identity
//! - [`Filter::Path`]: only when the node at a path changed identity
//! - [`Filter::Predicate`]: whatever the predicate does not suppress
//!
//! Filters are resolved once when subscribing. Each notification compares
//! the state recorded at the start of the dispatch with the state at
//! notification time.
//!
//! # Example
//!
//! ```ignore
//! let store = FilteredStore::new(create_store(reducer, initial_state));
//!
//! // Only hear about changes below `$.user.profile`
//! let mut handle = store.subscribe_filtered(
//!     |state, action| println!("profile changed by {:?}", action),
//!     "$.user.profile",
//! )?;
//!
//! store.dispatch(action)?;
//! handle.unsubscribe();
//! ```
//!
//! # Re-entrant dispatch
//!
//! A listener that dispatches into the same filtered store while it is
//! notifying gets `StoreError::ReentrantDispatch` unless the store was
//! configured with [`ReentrancyPolicy::Allow`].

mod enhancer;
mod filter;
mod types;

pub use enhancer::{enhance, FilterEnhancer, FilteredStore, FilteredSubscribe};
pub use filter::ResolvedFilter;
pub use types::{
    EnhancerConfig, Filter, Notification, NotificationStream, Predicate, ReentrancyPolicy,
};
