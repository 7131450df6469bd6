//! Diagnostic observers for injection traceability.
//!
//! Observers are registered on an [`Injector`](crate::Injector) and are told
//! about every construction pass of the injections attached through it:
//! when a factory starts, when it finishes, when it fails, and when a
//! re-entrant read is diverted to the recursion guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::early::EarlyObject;
use crate::error::InjectError;

/// Observer trait for construction events.
///
/// Calls are made synchronously on the reading thread, around the factory
/// invocation. Keep implementations lightweight.
///
/// # Examples
///
/// ```
/// use scope_inject::{EarlyObject, InjectionObserver, Injector, Injection};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct PrintObserver;
///
/// impl InjectionObserver for PrintObserver {
///     fn materializing(&self, early: &EarlyObject) {
///         println!("building {}", early.alias());
///     }
///
///     fn materialized(&self, early: &EarlyObject, duration: Duration) {
///         println!("built {} in {:?}", early.alias(), duration);
///     }
/// }
///
/// let injector = Injector::builder()
///     .observer(Arc::new(PrintObserver))
///     .build();
/// let scope = injector.scope();
/// Injection::new(|| Ok(7u8)).assign_to(&["seven"], &scope).unwrap();
/// assert_eq!(*scope.get::<u8>("seven").unwrap(), 7);
/// ```
pub trait InjectionObserver: Send + Sync {
    /// Called right before the factory runs.
    fn materializing(&self, early: &EarlyObject);

    /// Called after the factory returned a value.
    fn materialized(&self, early: &EarlyObject, duration: Duration);

    /// Called when a re-entrant read is handed to the recursion guard.
    fn recursion(&self, _early: &EarlyObject) {}

    /// Called when the factory returned an error. The error still propagates.
    fn factory_failed(&self, _early: &EarlyObject, _error: &InjectError) {}
}

/// Container for registered observers.
///
/// Cheap to clone; every construction record keeps a copy. Designed to have
/// minimal overhead when no observers are registered.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Arc<Vec<Arc<dyn InjectionObserver>>>,
}

impl Observers {
    pub(crate) fn new(observers: Vec<Arc<dyn InjectionObserver>>) -> Self {
        Self {
            observers: Arc::new(observers),
        }
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn materializing(&self, early: &EarlyObject) {
        for observer in self.observers.iter() {
            observer.materializing(early);
        }
    }

    #[inline]
    pub(crate) fn materialized(&self, early: &EarlyObject, duration: Duration) {
        for observer in self.observers.iter() {
            observer.materialized(early, duration);
        }
    }

    #[inline]
    pub(crate) fn recursion(&self, early: &EarlyObject) {
        for observer in self.observers.iter() {
            observer.recursion(early);
        }
    }

    #[inline]
    pub(crate) fn factory_failed(&self, early: &EarlyObject, error: &InjectError) {
        for observer in self.observers.iter() {
            observer.factory_failed(early, error);
        }
    }
}

/// Built-in observer forwarding events to `tracing`.
///
/// Events carry the alias and the handle's debug label as fields, so they
/// can be filtered with the usual `tracing-subscriber` directives on the
/// `scope_inject` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl InjectionObserver for TracingObserver {
    fn materializing(&self, early: &EarlyObject) {
        tracing::debug!(alias = early.alias(), label = early.debug_info(), "materializing");
    }

    fn materialized(&self, early: &EarlyObject, duration: Duration) {
        tracing::info!(
            alias = early.alias(),
            elapsed_us = duration.as_micros() as u64,
            "materialized"
        );
    }

    fn recursion(&self, early: &EarlyObject) {
        tracing::warn!(alias = early.alias(), label = early.debug_info(), "recursive request");
    }

    fn factory_failed(&self, early: &EarlyObject, error: &InjectError) {
        tracing::error!(alias = early.alias(), %error, "factory failed");
    }
}

/// Observer that counts events.
///
/// Useful in tests and health checks to assert how often factories ran.
///
/// ```
/// use scope_inject::{CountingObserver, Injector, Injection};
/// use std::sync::Arc;
///
/// let counter = Arc::new(CountingObserver::new());
/// let injector = Injector::builder().observer(counter.clone()).build();
/// let scope = injector.scope();
///
/// Injection::new(|| Ok("value")).once(true).assign_to(&["a", "b"], &scope).unwrap();
/// scope.get::<&str>("a").unwrap();
/// scope.get::<&str>("b").unwrap();
///
/// assert_eq!(counter.materialized_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct CountingObserver {
    materializing: AtomicUsize,
    materialized: AtomicUsize,
    recursions: AtomicUsize,
    failures: AtomicUsize,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn materializing_count(&self) -> usize {
        self.materializing.load(Ordering::SeqCst)
    }

    pub fn materialized_count(&self) -> usize {
        self.materialized.load(Ordering::SeqCst)
    }

    pub fn recursion_count(&self) -> usize {
        self.recursions.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl InjectionObserver for CountingObserver {
    fn materializing(&self, _early: &EarlyObject) {
        self.materializing.fetch_add(1, Ordering::SeqCst);
    }

    fn materialized(&self, _early: &EarlyObject, _duration: Duration) {
        self.materialized.fetch_add(1, Ordering::SeqCst);
    }

    fn recursion(&self, _early: &EarlyObject) {
        self.recursions.fetch_add(1, Ordering::SeqCst);
    }

    fn factory_failed(&self, _early: &EarlyObject, _error: &InjectError) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}
