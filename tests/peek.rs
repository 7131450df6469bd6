use scope_inject::{Injection, Injector, RecursionPolicy, Scope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_peek_does_not_trigger() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let scope = Scope::new();
    Injection::new(move || Ok(counter.fetch_add(1, Ordering::SeqCst)))
        .debug_info("lazy counter")
        .assign_to(&["n"], &scope)
        .unwrap();

    let early = scope.peek("n").unwrap();
    assert_eq!(early.alias(), "n");
    assert_eq!(early.debug_info(), "'n' from lazy counter");
    assert_eq!(early.state().debug_info(), "lazy counter");
    assert_eq!(early.to_string(), "<EarlyObject ('n' from lazy counter before inject())>");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    scope.get::<usize>("n").unwrap();
    assert!(scope.peek("n").is_none());
    assert!(scope.peek("missing").is_none());
}

#[test]
fn test_peek_or_inject_installs_once() {
    let injector = Injector::new();
    let scope = injector.scope();
    let made = AtomicUsize::new(0);

    let make = || {
        made.fetch_add(1, Ordering::SeqCst);
        Injection::new(|| Ok(String::from("conn")))
    };

    let first = injector.peek_or_inject(&scope, "conn", make).unwrap();
    let second = injector.peek_or_inject(&scope, "conn", make).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(made.load(Ordering::SeqCst), 1);

    assert_eq!(*scope.get::<String>("conn").unwrap(), "conn");
}

#[test]
fn test_peek_or_inject_replaces_plain_value() {
    let injector = Injector::new();
    let scope = injector.scope();
    scope.insert("slot", String::from("plain"));

    let early = injector
        .peek_or_inject(&scope, "slot", || Injection::new(|| Ok(String::from("lazy"))))
        .unwrap();
    assert_eq!(early.alias(), "slot");
    assert_eq!(*scope.get::<String>("slot").unwrap(), "lazy");
}

#[test]
fn test_peek_or_inject_is_strict_by_default() {
    let injector = Injector::new();
    let scope = injector.scope();
    let inner = scope.clone();
    injector
        .peek_or_inject(&scope, "self", move || {
            Injection::new(move || Ok(*inner.get_or("self", 1u8)?))
        })
        .unwrap();
    assert!(scope.get::<u8>("self").unwrap_err().is_recursion());

    let lenient_scope = injector.scope();
    let inner = lenient_scope.clone();
    injector
        .peek_or_inject(&lenient_scope, "self", move || {
            Injection::new(move || Ok(*inner.get_or("self", 1u8)?)).recursion(RecursionPolicy::Lenient)
        })
        .unwrap();
    assert_eq!(*lenient_scope.get::<u8>("self").unwrap(), 1);
}

#[test]
fn test_live_handles_track_installed_placeholders() {
    let injector = Injector::new();
    let first = injector.scope();
    let second = injector.scope();

    Injection::new(|| Ok(1u8)).assign_to(&["a", "b"], &first).unwrap();
    Injection::new(|| Ok(2u8)).assign_to(&["c"], &second).unwrap();

    let mut aliases: Vec<String> = injector
        .live_handles()
        .iter()
        .map(|early| early.alias().to_string())
        .collect();
    aliases.sort();
    assert_eq!(aliases, vec!["a", "b", "c"]);

    drop(second);
    assert_eq!(injector.handle_count(), 2);
}
