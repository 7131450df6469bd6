//! Shared construction record behind every alias of one injection.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::early::EarlyObject;
use crate::error::InjectResult;
use crate::internal::InFlightSet;
use crate::observer::Observers;
use crate::recursion::RecursionGuard;
use crate::scope::{Scope, WeakScope};

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased factory, with or without access to the target scope.
#[derive(Clone)]
pub(crate) enum Factory {
    Plain(Arc<dyn Fn() -> InjectResult<AnyArc> + Send + Sync>),
    WithScope(Arc<dyn Fn(&Scope) -> InjectResult<AnyArc> + Send + Sync>),
}

impl Factory {
    #[inline]
    pub(crate) fn call(&self, scope: &Scope) -> InjectResult<AnyArc> {
        match self {
            Factory::Plain(f) => f(),
            Factory::WithScope(f) => f(scope),
        }
    }

    pub(crate) fn passes_scope(&self) -> bool {
        matches!(self, Factory::WithScope(_))
    }
}

/// Shared construction record.
///
/// One `ObjectState` is created per attachment and shared by the
/// [`EarlyObject`] of every alias of that attachment. It stores the built
/// value, decides whether to build again, and diverts same-thread re-entry
/// to the recursion guard.
///
/// Cross-thread construction is not single-flight: two threads reading
/// different aliases of one record for the first time may both run the
/// factory. Under the build-once policy the first stored value wins and the
/// other result is discarded, so every reader observes the same value.
pub struct ObjectState {
    object: RwLock<Option<AnyArc>>,
    once: bool,
    factory: Factory,
    scope: WeakScope,
    recursion_guard: RecursionGuard,
    debug_info: String,
    running: InFlightSet,
    observers: Observers,
}

impl ObjectState {
    pub(crate) fn new(
        once: bool,
        factory: Factory,
        scope: WeakScope,
        recursion_guard: RecursionGuard,
        debug_info: String,
        observers: Observers,
    ) -> Self {
        Self {
            object: RwLock::new(None),
            once,
            factory,
            scope,
            recursion_guard,
            debug_info,
            running: InFlightSet::default(),
            observers,
        }
    }

    /// Whether the record builds its value only once.
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Whether a value is currently stored.
    pub fn is_built(&self) -> bool {
        self.object.read().is_some()
    }

    /// Whether any thread is running the factory right now.
    pub fn is_constructing(&self) -> bool {
        !self.running.is_empty()
    }

    /// Whether the factory receives the scope as its argument.
    pub fn passes_scope(&self) -> bool {
        self.factory.passes_scope()
    }

    /// Label of the injection this record was created from.
    pub fn debug_info(&self) -> &str {
        &self.debug_info
    }

    pub(crate) fn scope(&self) -> &WeakScope {
        &self.scope
    }

    /// Builds or reuses the value for `early`.
    ///
    /// Returns `Ok(None)` when a lenient recursion guard swallowed a
    /// re-entrant request and nothing has been built yet.
    pub(crate) fn materialize(
        &self,
        early: &EarlyObject,
        scope: &Scope,
    ) -> InjectResult<Option<AnyArc>> {
        if self.once {
            if let Some(value) = self.object.read().as_ref() {
                return Ok(Some(value.clone()));
            }
        }

        let Some(_in_flight) = self.running.enter(early.id()) else {
            tracing::warn!(alias = %early.alias(), "{} re-entered its own construction", early);
            self.observers.recursion(early);
            (self.recursion_guard)(early)?;
            return Ok(self.object.read().clone());
        };

        if !self.once {
            *self.object.write() = None;
        }

        let observed = self.observers.has_observers();
        let start = Instant::now();
        if observed {
            self.observers.materializing(early);
        }

        let value = match self.factory.call(scope) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(alias = %early.alias(), %error, "factory failed");
                if observed {
                    self.observers.factory_failed(early, &error);
                }
                return Err(error);
            }
        };

        // Double-checked store: under build-once the first stored value wins
        let stored = {
            let mut slot = self.object.write();
            match slot.as_ref() {
                Some(existing) if self.once => existing.clone(),
                _ => {
                    *slot = Some(value.clone());
                    value
                }
            }
        };

        if observed {
            self.observers.materialized(early, start.elapsed());
        }
        Ok(Some(stored))
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ObjectState ({})>", self.debug_info)
    }
}

impl fmt::Debug for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectState")
            .field("once", &self.once)
            .field("built", &self.is_built())
            .field("passes_scope", &self.passes_scope())
            .field("debug_info", &self.debug_info)
            .finish()
    }
}
