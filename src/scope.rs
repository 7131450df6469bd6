//! Mutable name-to-value scopes that injections are installed into.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::early::EarlyObject;
use crate::error::{InjectError, InjectResult};
use crate::injector::Injector;
use crate::key::Interception;
use crate::state::AnyArc;

#[cfg(feature = "ahash")]
pub(crate) type ScopeHasher = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
pub(crate) type ScopeHasher = std::collections::hash_map::RandomState;

/// What a scope holds under one alias.
pub(crate) enum Slot {
    /// A plain, already-built value
    Value(AnyArc),
    /// A placeholder whose key intercepts reads; `value` is what a plain
    /// match observes (the last value built by a dynamic handle)
    Trap {
        early: Arc<EarlyObject>,
        value: Option<AnyArc>,
    },
}

/// Shared, thread-safe name-to-value mapping.
///
/// A `Scope` is the namespace injections are attached to. Reading an alias
/// with [`get`](Scope::get) behaves like reading a plain entry: if a
/// placeholder is installed under the alias, the read drives its
/// interception key, which builds the value and rewrites the entry before
/// the read returns.
///
/// Cloning a `Scope` is cheap and yields another handle to the same
/// mapping. Every scope belongs to an [`Injector`], which serializes
/// attachments and tracks the installed handles.
///
/// The mapping's own lock is never held while factories, recursion guards or
/// destructors of displaced values run, so all of them may read the scope.
///
/// # Examples
///
/// ```rust
/// use scope_inject::{Injection, Scope};
/// use std::sync::Arc;
///
/// let scope = Scope::new();
/// scope.insert("port", 8080u16);
/// Injection::with_scope(|scope: &Scope| {
///     let port = scope.get::<u16>("port")?;
///     Ok(format!("http://localhost:{}", port))
/// })
/// .assign_to(&["url"], &scope)
/// .unwrap();
///
/// let url = scope.get::<String>("url").unwrap();
/// assert_eq!(*url, "http://localhost:8080");
/// assert!(Arc::ptr_eq(&url, &scope.get::<String>("url").unwrap()));
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    hasher: ScopeHasher,
    entries: RwLock<HashMap<Arc<str>, Slot, ScopeHasher>>,
    injector: Injector,
}

/// Non-owning reference held by construction records.
#[derive(Clone)]
pub(crate) struct WeakScope(Weak<ScopeInner>);

impl WeakScope {
    pub(crate) fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(|inner| Scope { inner })
    }
}

impl Scope {
    /// Creates an empty scope with its own injector.
    pub fn new() -> Self {
        Injector::new().scope()
    }

    pub(crate) fn with_injector(injector: Injector) -> Self {
        let hasher = ScopeHasher::default();
        Self {
            inner: Arc::new(ScopeInner {
                entries: RwLock::new(HashMap::with_hasher(hasher.clone())),
                hasher,
                injector,
            }),
        }
    }

    /// The injector this scope belongs to.
    pub fn injector(&self) -> &Injector {
        &self.inner.injector
    }

    pub(crate) fn downgrade(&self) -> WeakScope {
        WeakScope(Arc::downgrade(&self.inner))
    }

    /// Whether both handles refer to the same mapping.
    pub fn ptr_eq(a: &Scope, b: &Scope) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Hash of `alias` under this scope's hasher.
    pub fn hash_alias(&self, alias: &str) -> u64 {
        self.inner.hasher.hash_one(alias)
    }

    /// Binds `value` under `alias`, replacing any entry or placeholder.
    pub fn insert<T>(&self, alias: impl Into<Arc<str>>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.insert_arc(alias, Arc::new(value));
    }

    /// Binds an already shared value under `alias`.
    pub fn insert_arc<T>(&self, alias: impl Into<Arc<str>>, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        let displaced = self.put_slot(alias.into(), Slot::Value(value));
        drop(displaced);
    }

    /// Reads `alias` as a `T`, materializing an injected value if needed.
    ///
    /// # Errors
    ///
    /// [`InjectError::NotFound`] when nothing is bound (including when a
    /// lenient recursion guard swallowed a re-entrant read),
    /// [`InjectError::TypeMismatch`] when the value has another type, and
    /// any error raised by the factory or the recursion guard, unchanged.
    pub fn get<T>(&self, alias: &str) -> InjectResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        downcast(alias, self.get_any(alias)?)
    }

    /// Like [`get`](Scope::get), but an absent alias yields `Ok(None)`.
    pub fn try_get<T>(&self, alias: &str) -> InjectResult<Option<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        match self.try_get_any(alias)? {
            Some(value) => downcast(alias, value).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`get`](Scope::get), falling back to `default` when absent.
    pub fn get_or<T>(&self, alias: &str, default: T) -> InjectResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Ok(self.try_get(alias)?.unwrap_or_else(|| Arc::new(default)))
    }

    /// Reads `alias` without a type check.
    pub fn get_any(&self, alias: &str) -> InjectResult<Arc<dyn Any + Send + Sync>> {
        self.try_get_any(alias)?
            .ok_or_else(|| InjectError::NotFound(alias.to_string()))
    }

    /// Reads `alias` without a type check; absent yields `Ok(None)`.
    pub fn try_get_any(&self, alias: &str) -> InjectResult<Option<Arc<dyn Any + Send + Sync>>> {
        loop {
            let (early, cached) = match self.inner.entries.read().get(alias) {
                None => return Ok(None),
                Some(Slot::Value(value)) => return Ok(Some(value.clone())),
                Some(Slot::Trap { early, value }) => (early.clone(), value.clone()),
            };

            match early.key().intercept(alias)? {
                Interception::Triggered(value) => return Ok(value),
                Interception::Passthrough => return Ok(cached),
                Interception::Mismatch => return Ok(None),
                Interception::Stale => continue,
            }
        }
    }

    /// Removes whatever is bound under `alias`, placeholder included.
    pub fn remove(&self, alias: &str) -> bool {
        let displaced = self.take_slot(alias);
        displaced.is_some()
    }

    /// Whether anything, placeholder included, is bound under `alias`.
    pub fn contains(&self, alias: &str) -> bool {
        self.inner.entries.read().contains_key(alias)
    }

    /// Whether `alias` is bound to a plain, built value.
    pub fn is_materialized(&self, alias: &str) -> bool {
        matches!(self.inner.entries.read().get(alias), Some(Slot::Value(_)))
    }

    /// Returns the placeholder installed under `alias` without triggering it.
    pub fn peek(&self, alias: &str) -> Option<Arc<EarlyObject>> {
        match self.inner.entries.read().get(alias) {
            Some(Slot::Trap { early, .. }) => Some(early.clone()),
            _ => None,
        }
    }

    /// Aliases currently bound, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .entries
            .read()
            .keys()
            .map(|alias| alias.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Replaces the slot under `alias`, handing back the displaced one so
    /// the caller drops it outside the map lock.
    pub(crate) fn put_slot(&self, alias: Arc<str>, slot: Slot) -> Option<Slot> {
        self.inner.entries.write().insert(alias, slot)
    }

    pub(crate) fn take_slot(&self, alias: &str) -> Option<Slot> {
        self.inner.entries.write().remove(alias)
    }

    /// Whether `early` is the placeholder currently installed for its alias.
    pub(crate) fn is_installed(&self, early: &EarlyObject) -> bool {
        match self.inner.entries.read().get(early.alias()) {
            Some(Slot::Trap { early: installed, .. }) => installed.id() == early.id(),
            _ => false,
        }
    }
}

fn downcast<T>(alias: &str, value: AnyArc) -> InjectResult<Arc<T>>
where
    T: Any + Send + Sync,
{
    value.downcast::<T>().map_err(|_| InjectError::TypeMismatch {
        alias: alias.to_string(),
        expected: type_name::<T>(),
    })
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.entries.read();
        let mut map = f.debug_map();
        for (alias, slot) in entries.iter() {
            match slot {
                Slot::Value(_) => map.entry(alias, &"<value>"),
                Slot::Trap { early, .. } => map.entry(alias, &format_args!("{}", early)),
            };
        }
        map.finish()
    }
}
