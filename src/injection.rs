//! Attachment API: building injections and installing them into scopes.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::{Arc, Weak};

use crate::early::EarlyObject;
use crate::error::{InjectError, InjectResult};
use crate::recursion::{RecursionGuard, RecursionPolicy};
use crate::scope::Scope;
use crate::state::{AnyArc, Factory, ObjectState};

/// Reusable description of a lazily built value.
///
/// An `Injection` holds the factory and the construction policy. It does
/// nothing until it is assigned to one or more aliases of a [`Scope`]; every
/// assignment creates a fresh construction record, so one `Injection` can
/// serve several scopes, each building its own value.
///
/// # Options
///
/// - [`once`](Injection::once) (alias [`cache`](Injection::cache)): build a
///   single value and reuse it for every alias of the assignment. Otherwise
///   each construction pass builds anew.
/// - [`dynamic`](Injection::dynamic) (alias
///   [`cache_per_alias`](Injection::cache_per_alias)): keep the placeholder
///   installed after each read so the next read constructs again. Without
///   it, the first read freezes the alias to a plain value.
/// - [`recursion`](Injection::recursion) /
///   [`recursion_guard`](Injection::recursion_guard): what a factory sees
///   when it reads the alias it is building.
/// - [`debug_info`](Injection::debug_info): label used in diagnostics.
///
/// Factories created with [`with_scope`](Injection::with_scope) receive the
/// scope they were assigned to.
///
/// # Examples
///
/// ```rust
/// use scope_inject::{Injection, Scope};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = calls.clone();
/// let injection = Injection::new(move || {
///     Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
/// })
/// .once(true);
///
/// let first = Scope::new();
/// let second = Scope::new();
/// injection.assign_to(&["a", "b"], &first).unwrap();
/// injection.assign_to(&["a"], &second).unwrap();
///
/// assert_eq!(*first.get::<usize>("a").unwrap(), 1);
/// assert_eq!(*first.get::<usize>("b").unwrap(), 1);
/// assert_eq!(*second.get::<usize>("a").unwrap(), 2);
/// assert_eq!(calls.load(Ordering::SeqCst), 2);
/// ```
pub struct Injection<T> {
    factory: Factory,
    factory_name: &'static str,
    once: bool,
    dynamic: bool,
    recursion_guard: Option<RecursionGuard>,
    debug_info: Option<String>,
    origin: Option<&'static Location<'static>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Injection<T>
where
    T: Send + Sync + 'static,
{
    /// Injection built by a zero-argument factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> InjectResult<T> + Send + Sync + 'static,
    {
        let erased = move || factory().map(|value| Arc::new(value) as AnyArc);
        Self::from_factory(Factory::Plain(Arc::new(erased)), type_name::<F>())
    }

    /// Injection built by a factory that receives the target scope.
    ///
    /// Prefer this over capturing a clone of the scope in the factory: a
    /// captured scope keeps itself alive through its own placeholder until
    /// the alias is frozen, and forever for dynamic aliases.
    pub fn with_scope<F>(factory: F) -> Self
    where
        F: Fn(&Scope) -> InjectResult<T> + Send + Sync + 'static,
    {
        let erased = move |scope: &Scope| factory(scope).map(|value| Arc::new(value) as AnyArc);
        Self::from_factory(Factory::WithScope(Arc::new(erased)), type_name::<F>())
    }

    fn from_factory(factory: Factory, factory_name: &'static str) -> Self {
        Self {
            factory,
            factory_name,
            once: false,
            dynamic: false,
            recursion_guard: None,
            debug_info: None,
            origin: None,
            _marker: PhantomData,
        }
    }

    /// Build exactly once per assignment instead of on every pass.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Alias of [`once`](Injection::once).
    pub fn cache(self, cache: bool) -> Self {
        self.once(cache)
    }

    /// Keep re-triggering each alias on every read.
    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Alias of [`dynamic`](Injection::dynamic).
    pub fn cache_per_alias(self, cache_per_alias: bool) -> Self {
        self.dynamic(cache_per_alias)
    }

    /// Custom guard invoked on same-thread re-entrant construction.
    pub fn recursion_guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&EarlyObject) -> InjectResult<()> + Send + Sync + 'static,
    {
        self.recursion_guard = Some(Arc::new(guard));
        self
    }

    /// Selects one of the built-in recursion policies.
    pub fn recursion(mut self, policy: RecursionPolicy) -> Self {
        self.recursion_guard = Some(policy.guard());
        self
    }

    /// Free-text label shown in diagnostic representations.
    pub fn debug_info(mut self, debug_info: impl Into<String>) -> Self {
        self.debug_info = Some(debug_info.into());
        self
    }

    pub(crate) fn origin(mut self, origin: &'static Location<'static>) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Whether the factory receives the scope as its argument.
    pub fn passes_scope(&self) -> bool {
        self.factory.passes_scope()
    }

    /// Diagnostic label: the explicit debug info, or a description of the
    /// factory and options.
    pub fn label(&self) -> String {
        let base = match &self.debug_info {
            Some(debug_info) => debug_info.clone(),
            None => format!(
                "<injection factory={}, once={}, dynamic={}>",
                self.factory_name, self.once, self.dynamic
            ),
        };
        match self.origin {
            Some(origin) => format!("{} at {}:{}", base, origin.file(), origin.line()),
            None => base,
        }
    }

    /// Installs one placeholder per alias into `scope`.
    ///
    /// All aliases share one construction record. Without an explicit
    /// recursion guard the lenient policy applies.
    ///
    /// # Errors
    ///
    /// [`InjectError::NoAliases`] when `aliases` is empty, and
    /// [`InjectError::ShutDown`] when the scope's injector was shut down.
    /// The scope is left untouched in both cases.
    pub fn assign_to(&self, aliases: &[&str], scope: &Scope) -> InjectResult<AttachedHandles> {
        self.attach(aliases, scope, RecursionPolicy::Lenient)
    }

    pub(crate) fn attach(
        &self,
        aliases: &[&str],
        scope: &Scope,
        fallback: RecursionPolicy,
    ) -> InjectResult<AttachedHandles> {
        let label = self.label();
        if aliases.is_empty() {
            return Err(InjectError::NoAliases(format!("Injection::assign_to() ({})", label)));
        }

        let injector = scope.injector();
        let guard = self
            .recursion_guard
            .clone()
            .unwrap_or_else(|| fallback.guard());

        let state = Arc::new(ObjectState::new(
            self.once,
            self.factory.clone(),
            scope.downgrade(),
            guard,
            label.clone(),
            injector.observers().clone(),
        ));

        let handles: Vec<Arc<EarlyObject>> = aliases
            .iter()
            .map(|alias| {
                EarlyObject::new(
                    Arc::from(*alias),
                    scope.hash_alias(alias),
                    state.clone(),
                    self.dynamic,
                    format!("'{}' from {}", alias, label),
                )
            })
            .collect();

        injector.install(scope, &handles)?;
        Ok(AttachedHandles::new(&handles))
    }
}

impl<T> Clone for Injection<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            factory_name: self.factory_name,
            once: self.once,
            dynamic: self.dynamic,
            recursion_guard: self.recursion_guard.clone(),
            debug_info: self.debug_info.clone(),
            origin: self.origin,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Injection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injection")
            .field("factory", &self.factory_name)
            .field("passes_scope", &self.factory.passes_scope())
            .field("once", &self.once)
            .field("dynamic", &self.dynamic)
            .field("custom_recursion_guard", &self.recursion_guard.is_some())
            .field("debug_info", &self.debug_info)
            .finish()
    }
}

/// Weak view of the placeholders created by one assignment.
///
/// Holding an `AttachedHandles` does not keep the placeholders alive: once
/// an alias is read and frozen, its handle is gone.
#[derive(Debug, Clone, Default)]
pub struct AttachedHandles {
    handles: Vec<Weak<EarlyObject>>,
}

impl AttachedHandles {
    fn new(handles: &[Arc<EarlyObject>]) -> Self {
        Self {
            handles: handles.iter().map(Arc::downgrade).collect(),
        }
    }

    /// Number of placeholders created, alive or not.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Placeholders still alive.
    pub fn alive(&self) -> Vec<Arc<EarlyObject>> {
        self.handles.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn live_count(&self) -> usize {
        self.handles.iter().filter(|h| h.strong_count() > 0).count()
    }
}

/// Installs an injection into `into` under every alias, immediately.
///
/// Without an explicit recursion guard on `injection`, the strict policy
/// applies: a factory reading its own alias fails with
/// [`InjectError::Recursion`].
///
/// # Examples
///
/// ```rust
/// use scope_inject::{inject, Injection, Scope};
///
/// let scope = Scope::new();
/// inject(&["x"], &scope, Injection::new(|| Ok("v"))).unwrap();
/// assert!(!scope.is_materialized("x"));
/// assert_eq!(*scope.get::<&str>("x").unwrap(), "v");
/// assert!(scope.is_materialized("x"));
///
/// assert!(inject(&[], &scope, Injection::new(|| Ok("v"))).is_err());
/// ```
pub fn inject<T>(aliases: &[&str], into: &Scope, injection: Injection<T>) -> InjectResult<()>
where
    T: Send + Sync + 'static,
{
    injection.attach(aliases, into, RecursionPolicy::Strict)?;
    Ok(())
}

/// Builder form: optionally installs `injection` and hands it back for reuse.
///
/// With `into` set, behaves like [`Injection::assign_to`] (lenient recursion
/// unless configured otherwise). With `into` unset nothing is installed and
/// `aliases` are ignored; assign the returned injection later.
pub fn injection<T>(
    aliases: &[&str],
    into: Option<&Scope>,
    injection: Injection<T>,
) -> InjectResult<Injection<T>>
where
    T: Send + Sync + 'static,
{
    if let Some(scope) = into {
        injection.assign_to(aliases, scope)?;
    }
    Ok(injection)
}
