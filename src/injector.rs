//! The injector: shared coordination state for a family of scopes.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::config::InjectorConfig;
use crate::early::EarlyObject;
use crate::error::{InjectError, InjectResult};
use crate::injection::Injection;
use crate::observer::{InjectionObserver, Observers};
use crate::recursion::RecursionPolicy;
use crate::scope::{Scope, Slot};

/// Coordinates attachments into the scopes it creates.
///
/// The injector owns the process-wide pieces of the mechanism:
///
/// - the reassignment lock, which serializes the installation of
///   placeholders so concurrent attachments never interleave,
/// - the peek lock behind [`peek_or_inject`](Injector::peek_or_inject),
/// - a weak registry of installed handles for diagnostics,
/// - the registered [`InjectionObserver`]s and the [`InjectorConfig`]
///   defaults applied by [`injection`](Injector::injection).
///
/// Cloning is cheap and shares all of the above. [`Scope::new`] creates a
/// scope with a private injector; create scopes through
/// [`scope`](Injector::scope) to share one.
///
/// # Examples
///
/// ```rust
/// use scope_inject::{Injector, InjectorConfig};
///
/// let injector = Injector::with_config(InjectorConfig {
///     once: true,
///     ..InjectorConfig::default()
/// });
/// let scope = injector.scope();
///
/// injector
///     .injection(|| Ok(String::from("shared")))
///     .assign_to(&["a", "b"], &scope)
///     .unwrap();
///
/// let a = scope.get::<String>("a").unwrap();
/// let b = scope.get::<String>("b").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

struct InjectorInner {
    config: InjectorConfig,
    observers: Observers,
    reassignment: Mutex<()>,
    peek: ReentrantMutex<()>,
    handles: Mutex<Vec<Weak<EarlyObject>>>,
    shut_down: AtomicBool,
}

impl Injector {
    pub fn new() -> Self {
        Self::with_config(InjectorConfig::default())
    }

    pub fn with_config(config: InjectorConfig) -> Self {
        Self::from_parts(config, Observers::default())
    }

    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    fn from_parts(config: InjectorConfig, observers: Observers) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                config,
                observers,
                reassignment: Mutex::new(()),
                peek: ReentrantMutex::new(()),
                handles: Mutex::new(Vec::new()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.inner.config
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    /// Creates an empty scope coordinated by this injector.
    pub fn scope(&self) -> Scope {
        Scope::with_injector(self.clone())
    }

    /// Injection whose options start from this injector's configuration.
    #[track_caller]
    pub fn injection<T, F>(&self, factory: F) -> Injection<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> InjectResult<T> + Send + Sync + 'static,
    {
        self.configure(Injection::new(factory), Location::caller())
    }

    /// Like [`injection`](Injector::injection), for factories that receive
    /// the scope.
    #[track_caller]
    pub fn injection_with_scope<T, F>(&self, factory: F) -> Injection<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> InjectResult<T> + Send + Sync + 'static,
    {
        self.configure(Injection::with_scope(factory), Location::caller())
    }

    fn configure<T>(&self, injection: Injection<T>, caller: &'static Location<'static>) -> Injection<T>
    where
        T: Send + Sync + 'static,
    {
        let config = &self.inner.config;
        let injection = injection
            .once(config.once)
            .dynamic(config.dynamic)
            .recursion(config.recursion);
        if config.record_origin {
            injection.origin(caller)
        } else {
            injection
        }
    }

    /// Returns the placeholder under `alias`, installing one first if absent.
    ///
    /// The check and the installation happen under one lock, so concurrent
    /// callers racing on the same alias end up with the same handle and
    /// `make` runs at most once. A plain value already bound under `alias`
    /// is replaced. Without an explicit recursion guard on the injection,
    /// the strict policy applies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scope_inject::{Injection, Injector};
    /// use std::sync::Arc;
    ///
    /// let injector = Injector::new();
    /// let scope = injector.scope();
    ///
    /// let first = injector
    ///     .peek_or_inject(&scope, "pool", || Injection::new(|| Ok(vec![1, 2, 3])))
    ///     .unwrap();
    /// let second = injector
    ///     .peek_or_inject::<Vec<i32>, _>(&scope, "pool", || unreachable!())
    ///     .unwrap();
    /// assert!(Arc::ptr_eq(&first, &second));
    /// ```
    pub fn peek_or_inject<T, M>(
        &self,
        scope: &Scope,
        alias: &str,
        make: M,
    ) -> InjectResult<Arc<EarlyObject>>
    where
        T: Send + Sync + 'static,
        M: FnOnce() -> Injection<T>,
    {
        let _peek = self.inner.peek.lock();
        if let Some(early) = scope.peek(alias) {
            return Ok(early);
        }

        let handles = make().attach(&[alias], scope, RecursionPolicy::Strict)?;
        handles
            .alive()
            .into_iter()
            .next()
            .ok_or_else(|| InjectError::NotFound(alias.to_string()))
    }

    /// Handles that are still installed somewhere (or otherwise alive).
    ///
    /// Prunes entries for handles that have been dropped.
    pub fn live_handles(&self) -> Vec<Arc<EarlyObject>> {
        let mut handles = self.inner.handles.lock();
        handles.retain(|handle| handle.strong_count() > 0);
        handles.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn handle_count(&self) -> usize {
        self.live_handles().len()
    }

    /// Rejects further attachments through this injector.
    ///
    /// Placeholders already installed keep working.
    pub fn shutdown(&self) {
        if !self.inner.shut_down.swap(true, Ordering::AcqRel) {
            tracing::info!(live_handles = self.handle_count(), "injector shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Installs `handles` into `scope` under the reassignment lock.
    pub(crate) fn install(&self, scope: &Scope, handles: &[Arc<EarlyObject>]) -> InjectResult<()> {
        if self.is_shut_down() {
            return Err(InjectError::ShutDown);
        }

        let displaced: Vec<Slot> = {
            let _reassignment = self.inner.reassignment.lock();
            handles
                .iter()
                .filter_map(|early| {
                    scope.put_slot(
                        early.alias_arc(),
                        Slot::Trap {
                            early: early.clone(),
                            value: None,
                        },
                    )
                })
                .collect()
        };

        {
            let mut registry = self.inner.handles.lock();
            registry.retain(|handle| handle.strong_count() > 0);
            registry.extend(handles.iter().map(Arc::downgrade));
        }

        tracing::debug!(
            aliases = handles.len(),
            replaced = displaced.len(),
            "placeholders installed"
        );
        drop(displaced);
        Ok(())
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("config", &self.inner.config)
            .field("observers", &self.inner.observers.has_observers())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Builder for an [`Injector`] with observers and configuration.
#[derive(Default)]
pub struct InjectorBuilder {
    config: InjectorConfig,
    observers: Vec<Arc<dyn InjectionObserver>>,
}

impl InjectorBuilder {
    pub fn config(mut self, config: InjectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an observer notified of every construction pass.
    pub fn observer(mut self, observer: Arc<dyn InjectionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Injector {
        Injector::from_parts(self.config, Observers::new(self.observers))
    }
}
