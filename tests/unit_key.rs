/// Unit tests for InjectionKey behavior through real placeholders

use scope_inject::{Injection, Scope};
use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_key_equals_and_hashes_like_alias() {
    let scope = Scope::new();
    Injection::new(|| Ok(1u8)).assign_to(&["config"], &scope).unwrap();

    let early = scope.peek("config").unwrap();
    let key = early.key();
    let as_str: &str = Borrow::<str>::borrow(key);

    assert_eq!(as_str, "config");
    assert_eq!(hash_of(key), hash_of("config"));
    assert_ne!(hash_of(key), hash_of("other"));
}

#[test]
fn test_keys_of_same_alias_are_equal() {
    let first = Scope::new();
    let second = Scope::new();
    let injection = Injection::new(|| Ok(1u8));
    injection.assign_to(&["db"], &first).unwrap();
    injection.assign_to(&["db"], &second).unwrap();
    Injection::new(|| Ok(2u8)).assign_to(&["cache"], &second).unwrap();

    let a = first.peek("db").unwrap();
    let b = second.peek("db").unwrap();
    let c = second.peek("cache").unwrap();
    assert!(a.key() == b.key());
    assert!(a.key() != c.key());
}

#[test]
fn test_mismatched_comparison_has_no_side_effects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let scope = Scope::new();
    Injection::new(move || Ok(counter.fetch_add(1, Ordering::SeqCst)))
        .assign_to(&["lazy"], &scope)
        .unwrap();

    let early = scope.peek("lazy").unwrap();
    for candidate in ["", "laz", "lazy_", "LAZY"] {
        assert!(!early.key().compare(candidate).unwrap());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(scope.peek("lazy").is_some());
}

#[test]
fn test_key_outlives_dropped_scope() {
    let scope = Scope::new();
    Injection::new(|| Ok(1u8)).assign_to(&["orphan"], &scope).unwrap();
    let early = scope.peek("orphan").unwrap();
    drop(scope);

    // No scope to rewrite: a plain match without construction
    assert!(early.key().compare("orphan").unwrap());
    assert!(!early.state().is_built());
    assert!(early.inject().is_err());
}

#[test]
fn test_key_debug_output() {
    let scope = Scope::new();
    Injection::new(|| Ok(1u8)).assign_to(&["shown"], &scope).unwrap();
    let early = scope.peek("shown").unwrap();

    let debug = format!("{:?}", early.key());
    assert!(debug.contains("InjectionKey"));
    assert!(debug.contains("\"shown\""));
    assert!(debug.contains("armed: false"));
}
