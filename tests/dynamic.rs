use scope_inject::{Injection, Scope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn numbered(calls: &Arc<AtomicUsize>) -> Injection<String> {
    let counter = calls.clone();
    Injection::new(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("injected_object_{}", n))
    })
}

#[test]
fn test_dynamic_rebuilds_on_every_read() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Scope::new();
    numbered(&calls).dynamic(true).assign_to(&["obj"], &scope).unwrap();

    assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_1");
    assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_2");
    assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_3");
    assert!(scope.peek("obj").is_some());
    assert!(!scope.is_materialized("obj"));
}

#[test]
fn test_dynamic_once_reuses_value() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Scope::new();
    numbered(&calls)
        .once(true)
        .cache_per_alias(true)
        .assign_to(&["obj"], &scope)
        .unwrap();

    let first = scope.get::<String>("obj").unwrap();
    let second = scope.get::<String>("obj").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Still intercepting, even though nothing is rebuilt
    assert!(scope.peek("obj").is_some());
}

#[test]
fn test_explicit_inject_then_plain_read() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Scope::new();
    numbered(&calls).dynamic(true).assign_to(&["obj"], &scope).unwrap();

    let early = scope.peek("obj").unwrap();
    assert!(early.is_dynamic());
    assert!(early.inject().unwrap());
    assert!(early.key().is_armed());

    // The read right after an explicit inject observes that value
    assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_1");
    assert!(!early.key().is_armed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // And the one after that builds again
    assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_2");
}

#[test]
fn test_explicit_inject_on_static_handle_freezes() {
    let scope = Scope::new();
    Injection::new(|| Ok(10u16)).assign_to(&["n"], &scope).unwrap();

    let early = scope.peek("n").unwrap();
    assert!(early.inject().unwrap());
    assert!(!early.key().is_armed());
    assert!(scope.is_materialized("n"));
    assert_eq!(*scope.get::<u16>("n").unwrap(), 10);
}

#[test]
fn test_key_compare_triggers_construction() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Scope::new();
    numbered(&calls).assign_to(&["obj"], &scope).unwrap();

    let early = scope.peek("obj").unwrap();
    let key = early.key();
    assert_eq!(key.origin(), "obj");
    assert_eq!(key.precomputed_hash(), scope.hash_alias("obj"));

    assert!(!key.compare("other").unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(key.compare("obj").unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(scope.is_materialized("obj"));

    // The handle is no longer installed; comparing again is a plain match
    assert!(key.compare("obj").unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_displaced_handle_inject_leaves_scope_alone() {
    let scope = Scope::new();
    Injection::new(|| Ok("old")).assign_to(&["x"], &scope).unwrap();
    let old = scope.peek("x").unwrap();

    Injection::new(|| Ok("new")).assign_to(&["x"], &scope).unwrap();
    assert!(!old.inject().unwrap());
    assert!(!old.state().is_built());
    assert_eq!(*scope.get::<&str>("x").unwrap(), "new");
}

#[test]
fn test_overwritten_handle_inject_keeps_inserted_value() {
    let scope = Scope::new();
    Injection::new(|| Ok(1u8)).dynamic(true).assign_to(&["n"], &scope).unwrap();
    let early = scope.peek("n").unwrap();

    scope.insert("n", 9u8);
    assert!(!early.inject().unwrap());
    assert!(!early.key().is_armed());
    assert!(scope.is_materialized("n"));
    assert_eq!(*scope.get::<u8>("n").unwrap(), 9);
}

#[test]
fn test_frozen_handle_inject_is_a_no_op() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Scope::new();
    numbered(&calls).assign_to(&["obj"], &scope).unwrap();
    let early = scope.peek("obj").unwrap();

    assert!(early.inject().unwrap());
    assert!(!early.inject().unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_1");
}
