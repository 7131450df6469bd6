use scope_inject::{
    inject, strict_recursion_guard, CountingObserver, InjectError, Injection, Injector,
    RecursionPolicy, Scope,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_lenient_guard_yields_default() {
    let scope = Scope::new();
    let inner = scope.clone();
    Injection::new(move || {
        let value = inner.get_or("a", String::from("default_value"))?;
        Ok((*value).clone())
    })
    .recursion(RecursionPolicy::Lenient)
    .assign_to(&["a"], &scope)
    .unwrap();

    assert_eq!(*scope.get::<String>("a").unwrap(), "default_value");
}

#[test]
fn test_assign_to_is_lenient_by_default() {
    let scope = Scope::new();
    let inner = scope.clone();
    Injection::new(move || Ok(inner.try_get::<u8>("a")?.is_none()))
        .assign_to(&["a"], &scope)
        .unwrap();

    assert!(*scope.get::<bool>("a").unwrap());
}

#[test]
fn test_strict_guard_raises_naming_the_handle() {
    let scope = Scope::new();
    let inner = scope.clone();
    inject(
        &["a"],
        &scope,
        Injection::new(move || Ok(*inner.get::<u8>("a")?))
            .debug_info("self-reader"),
    )
    .unwrap();

    let err = scope.get::<u8>("a").unwrap_err();
    assert!(err.is_recursion());
    let message = err.to_string();
    assert!(message.contains("requested itself"));
    assert!(message.contains("<EarlyObject ('a' from self-reader before inject())>"));

    // Nothing was stored; the placeholder is still there
    assert!(scope.peek("a").is_some());
    assert!(!scope.is_materialized("a"));
}

#[test]
fn test_explicit_guard_overrides_strict_default() {
    let scope = Scope::new();
    let inner = scope.clone();
    inject(
        &["a"],
        &scope,
        Injection::new(move || Ok(*inner.get_or("a", 3u8)? * 2)).recursion(RecursionPolicy::Lenient),
    )
    .unwrap();

    assert_eq!(*scope.get::<u8>("a").unwrap(), 6);
}

#[test]
fn test_custom_guard_sees_the_handle() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let scope = Scope::new();
    let inner = scope.clone();
    Injection::new(move || Ok(*inner.get_or("loop", 0u32)? + 1))
        .recursion_guard(move |early| {
            assert_eq!(early.alias(), "loop");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .assign_to(&["loop"], &scope)
        .unwrap();

    assert_eq!(*scope.get::<u32>("loop").unwrap(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_custom_strict_guard_function() {
    let scope = Scope::new();
    let inner = scope.clone();
    Injection::new(move || Ok(*inner.get::<i64>("n")?))
        .recursion_guard(strict_recursion_guard)
        .assign_to(&["n"], &scope)
        .unwrap();

    assert!(matches!(scope.get::<i64>("n"), Err(InjectError::Recursion(_))));
}

#[test]
fn test_recursion_reaches_observers() {
    let counter = Arc::new(CountingObserver::new());
    let injector = Injector::builder().observer(counter.clone()).build();
    let scope = injector.scope();
    let inner = scope.clone();

    Injection::new(move || Ok(*inner.get_or("x", 0u8)?))
        .assign_to(&["x"], &scope)
        .unwrap();
    scope.get::<u8>("x").unwrap();

    assert_eq!(counter.recursion_count(), 1);
    assert_eq!(counter.materialized_count(), 1);
}

#[test]
fn test_sibling_alias_read_under_build_once() {
    // The sibling builds once more, then re-enters itself
    let scope = Scope::new();
    let inner = scope.clone();
    inject(
        &["left", "right"],
        &scope,
        Injection::new(move || Ok(*inner.get::<u8>("right")?)).once(true),
    )
    .unwrap();

    let err = scope.get::<u8>("left").unwrap_err();
    assert!(err.is_recursion());
    assert!(err.to_string().contains("'right'"));
}

#[test]
fn test_lenient_self_read_then_failure_keeps_placeholder() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let scope = Scope::new();
    let inner = scope.clone();
    Injection::new(move || {
        let nested = inner.try_get::<u8>("y")?;
        assert!(nested.is_none());
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(InjectError::factory_msg("transient"));
        }
        Ok(5u8)
    })
    .recursion(RecursionPolicy::Lenient)
    .assign_to(&["y"], &scope)
    .unwrap();

    let first = scope.get::<u8>("y").unwrap_err();
    assert_eq!(first.to_string(), "transient");
    // The nested read did not take the placeholder with it
    assert!(scope.peek("y").is_some());

    assert_eq!(*scope.get::<u8>("y").unwrap(), 5);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_lenient_self_read_leaves_entry_during_build() {
    let scope = Scope::new();
    let inner = scope.clone();
    Injection::new(move || {
        inner.try_get::<u8>("z")?;
        Ok(inner.contains("z"))
    })
    .assign_to(&["z"], &scope)
    .unwrap();

    assert!(*scope.get::<bool>("z").unwrap());
}
