//! Interception keys: the trigger point of an injected alias.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::early::EarlyObject;
use crate::error::InjectResult;
use crate::internal::ReentrancyMarker;
use crate::state::AnyArc;

/// Outcome of comparing a requested name against an interception key.
pub(crate) enum Interception {
    /// The name is not this key's alias
    Mismatch,
    /// Plain match; the caller uses whatever the slot already holds
    Passthrough,
    /// Construction ran; carries the value now bound to the alias, if any
    Triggered(Option<AnyArc>),
    /// The handle was no longer installed; the caller must look again
    Stale,
}

/// Scope-visible key standing in for an alias string.
///
/// An `InjectionKey` is equal to, and hashes like, its alias string, so it
/// can replace the plain string in maps and sets. Its [`compare`] operation
/// is the trigger point of an injection: comparing a matching name runs the
/// placeholder handle behind the key.
///
/// A single lookup performs at most one construction pass. Comparisons made
/// while the handle is already rewriting the scope on the same thread, and
/// the one comparison following an explicit [`EarlyObject::inject`] on a
/// dynamic handle, report a match without side effects.
///
/// [`compare`]: InjectionKey::compare
pub struct InjectionKey {
    origin: Arc<str>,
    hash: u64,
    reset: AtomicBool,
    early: Weak<EarlyObject>,
}

impl InjectionKey {
    pub(crate) fn new(origin: Arc<str>, hash: u64, early: Weak<EarlyObject>) -> Self {
        Self {
            origin,
            hash,
            reset: AtomicBool::new(false),
            early,
        }
    }

    /// The alias this key stands for.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Hash of the alias under the owning scope's hasher.
    ///
    /// Equal to [`Scope::hash_alias`](crate::Scope::hash_alias) of the plain
    /// alias string.
    pub fn precomputed_hash(&self) -> u64 {
        self.hash
    }

    /// Whether the next matching comparison is a plain match.
    pub fn is_armed(&self) -> bool {
        self.reset.load(Ordering::Acquire)
    }

    pub(crate) fn arm(&self) {
        self.reset.store(true, Ordering::Release);
    }

    /// The placeholder handle behind this key, while it is alive.
    pub fn handle(&self) -> Option<Arc<EarlyObject>> {
        self.early.upgrade()
    }

    /// Compares `candidate` with the alias, triggering injection on a match.
    ///
    /// Returns `Ok(false)` without side effects when the names differ.
    /// Factory and recursion errors raised by the triggered construction
    /// propagate unchanged.
    pub fn compare(&self, candidate: &str) -> InjectResult<bool> {
        Ok(!matches!(self.intercept(candidate)?, Interception::Mismatch))
    }

    pub(crate) fn intercept(&self, candidate: &str) -> InjectResult<Interception> {
        if *self.origin != *candidate {
            return Ok(Interception::Mismatch);
        }

        if self.reset.swap(false, Ordering::AcqRel) {
            tracing::trace!(alias = %self.origin, "one-shot plain match");
            return Ok(Interception::Passthrough);
        }

        let Some(early) = self.early.upgrade() else {
            return Ok(Interception::Passthrough);
        };

        if ReentrancyMarker::is_set(early.id()) {
            tracing::trace!(alias = %self.origin, "re-entrant comparison during rewrite");
            return Ok(Interception::Passthrough);
        }

        let _guard = early.lock();
        let Some(scope) = early.state().scope().upgrade() else {
            return Ok(Interception::Passthrough);
        };

        // Another reader may have rewritten the entry while we waited
        if !scope.is_installed(&early) {
            return Ok(Interception::Stale);
        }

        early.trigger(&scope).map(Interception::Triggered)
    }
}

impl PartialEq for InjectionKey {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
    }
}

impl Eq for InjectionKey {}

impl Hash for InjectionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.origin).hash(state);
    }
}

impl Borrow<str> for InjectionKey {
    fn borrow(&self) -> &str {
        &self.origin
    }
}

impl fmt::Debug for InjectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionKey")
            .field("origin", &self.origin)
            .field("hash", &self.hash)
            .field("armed", &self.is_armed())
            .finish()
    }
}
