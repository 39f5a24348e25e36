//! Listener invocation and filter gating over scalar state.

use filtered_store::{
    create_store, enhance, BaseStore, Filter, FilteredStore, FilteredSubscribe, Store,
    SubscriptionHandle,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
struct Action {
    kind: &'static str,
    payload: i64,
}

fn test_action(payload: i64) -> Action {
    Action {
        kind: "test",
        payload,
    }
}

type Calls = Arc<Mutex<Vec<(i64, Option<Action>)>>>;

fn recorder(calls: &Calls) -> impl Fn(&i64, Option<&Action>) + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move |state: &i64, action: Option<&Action>| calls.lock().push((*state, action.cloned()))
}

fn unchanged_store() -> FilteredStore<BaseStore<i64, Action>> {
    enhance(|initial: i64| create_store(|state: &i64, _: &Action| Ok(*state), initial))(0)
}

fn incrementing_store() -> FilteredStore<BaseStore<i64, Action>> {
    enhance(|initial: i64| {
        create_store(
            |state: &i64, action: &Action| {
                Ok(if action.kind == "test" { state + 1 } else { *state })
            },
            initial,
        )
    })(0)
}

fn dispatch_payloads(store: &impl Store<Action = Action>, payloads: std::ops::RangeInclusive<i64>) {
    for payload in payloads {
        store.dispatch(test_action(payload)).unwrap();
    }
}

// --- State never changes ---

#[test]
fn test_unfiltered_listener_always_called() {
    let store = unchanged_store();
    let calls: Calls = Arc::default();
    let mut handle = store.subscribe_filtered(recorder(&calls), Filter::None).unwrap();

    dispatch_payloads(&store, 1..=5);

    let expected: Vec<_> = (1..=5).map(|i| (0, Some(test_action(i)))).collect();
    assert_eq!(*calls.lock(), expected);
    handle.unsubscribe();
}

#[test]
fn test_identity_filter_never_called_for_unchanged_state() {
    let store = unchanged_store();
    let calls: Calls = Arc::default();
    let mut handle = store.subscribe_filtered(recorder(&calls), true).unwrap();

    dispatch_payloads(&store, 1..=5);

    assert!(calls.lock().is_empty());
    handle.unsubscribe();
}

#[test]
fn test_false_and_empty_string_do_not_filter() {
    let store = unchanged_store();
    let by_false: Calls = Arc::default();
    let by_empty: Calls = Arc::default();
    let by_blank: Calls = Arc::default();
    store.subscribe_filtered(recorder(&by_false), false).unwrap();
    store.subscribe_filtered(recorder(&by_empty), "").unwrap();
    store.subscribe_filtered(recorder(&by_blank), "   ").unwrap();

    dispatch_payloads(&store, 1..=3);

    assert_eq!(by_false.lock().len(), 3);
    assert_eq!(by_empty.lock().len(), 3);
    assert_eq!(by_blank.lock().len(), 3);
}

// --- State increments by 1 ---

#[test]
fn test_listener_receives_new_state_and_action() {
    let store = incrementing_store();
    let calls: Calls = Arc::default();
    store.subscribe_filtered(recorder(&calls), Filter::None).unwrap();

    dispatch_payloads(&store, 1..=5);

    let expected: Vec<_> = (1..=5).map(|i| (i, Some(test_action(i)))).collect();
    assert_eq!(*calls.lock(), expected);
}

#[test]
fn test_predicate_only_passes_even_states() {
    let store = incrementing_store();
    let calls: Calls = Arc::default();
    store
        .subscribe_filtered(
            recorder(&calls),
            Filter::predicate(|_old, new: &i64| new % 2 != 0),
        )
        .unwrap();

    dispatch_payloads(&store, 1..=5);

    let states: Vec<i64> = calls.lock().iter().map(|(state, _)| *state).collect();
    assert_eq!(states, vec![2, 4]);
}

#[test]
fn test_identity_filter_called_on_every_change() {
    let store = incrementing_store();
    let calls: Calls = Arc::default();
    store.subscribe_filtered(recorder(&calls), true).unwrap();

    dispatch_payloads(&store, 1..=3);
    store
        .dispatch(Action {
            kind: "other",
            payload: 0,
        })
        .unwrap();

    let states: Vec<i64> = calls.lock().iter().map(|(state, _)| *state).collect();
    assert_eq!(states, vec![1, 2, 3]);
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let store = incrementing_store();
    let calls: Calls = Arc::default();
    let mut handle: SubscriptionHandle =
        store.subscribe_filtered(recorder(&calls), Filter::None).unwrap();

    dispatch_payloads(&store, 1..=2);
    handle.unsubscribe();
    dispatch_payloads(&store, 3..=5);
    handle.unsubscribe();

    assert_eq!(calls.lock().len(), 2);
    assert!(!handle.is_active());
    assert_eq!(store.inner().listener_count(), 0);
}

#[test]
fn test_each_listener_uses_its_own_filter() {
    let store = incrementing_store();
    let all: Calls = Arc::default();
    let even: Calls = Arc::default();
    let changed: Calls = Arc::default();

    store.subscribe_filtered(recorder(&all), Filter::None).unwrap();
    store
        .subscribe_filtered(recorder(&even), Filter::predicate(|_, new: &i64| new % 2 != 0))
        .unwrap();
    store.subscribe_filtered(recorder(&changed), true).unwrap();

    dispatch_payloads(&store, 1..=4);
    store
        .dispatch(Action {
            kind: "noop",
            payload: 0,
        })
        .unwrap();

    assert_eq!(all.lock().len(), 5);
    assert_eq!(even.lock().len(), 2);
    assert_eq!(changed.lock().len(), 4);
}
