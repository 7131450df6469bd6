//! Placeholder handles ("early objects") installed into scopes.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::{InjectError, InjectResult};
use crate::internal::ReentrancyMarker;
use crate::key::InjectionKey;
use crate::scope::{Scope, Slot};
use crate::state::{AnyArc, ObjectState};

static NEXT_HANDLE_ID: AtomicUsize = AtomicUsize::new(1);

/// Placeholder for one alias whose value has not been read yet.
///
/// Every alias of an attachment gets its own `EarlyObject`; all of them share
/// one [`ObjectState`]. The handle is owned by the scope slot it is installed
/// under and disappears from the scope on the first successful read, unless
/// it is *dynamic*, in which case it is reinstalled after every read so the
/// next read builds again.
///
/// Handles can be inspected without triggering construction through
/// [`Scope::peek`](crate::Scope::peek).
///
/// # Examples
///
/// ```rust
/// use scope_inject::{Injection, Scope};
///
/// let scope = Scope::new();
/// Injection::new(|| Ok(42u32)).assign_to(&["answer"], &scope).unwrap();
///
/// let early = scope.peek("answer").unwrap();
/// assert_eq!(early.alias(), "answer");
/// assert!(!early.state().is_built());
///
/// assert_eq!(*scope.get::<u32>("answer").unwrap(), 42);
/// assert!(scope.peek("answer").is_none());
/// ```
pub struct EarlyObject {
    id: usize,
    alias: Arc<str>,
    state: Arc<ObjectState>,
    dynamic: bool,
    mutex: ReentrantMutex<()>,
    debug_info: String,
    key: InjectionKey,
}

impl EarlyObject {
    pub(crate) fn new(
        alias: Arc<str>,
        alias_hash: u64,
        state: Arc<ObjectState>,
        dynamic: bool,
        debug_info: String,
    ) -> Arc<Self> {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        Arc::new_cyclic(|this: &Weak<EarlyObject>| Self {
            id,
            key: InjectionKey::new(alias.clone(), alias_hash, this.clone()),
            alias,
            state,
            dynamic,
            mutex: ReentrantMutex::new(()),
            debug_info,
        })
    }

    /// Process-unique identity of this handle.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The name this handle is installed under.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) fn alias_arc(&self) -> Arc<str> {
        self.alias.clone()
    }

    /// Whether this alias keeps re-triggering after every read.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Diagnostic label, `'alias' from <injection label>`.
    pub fn debug_info(&self) -> &str {
        &self.debug_info
    }

    /// The construction record shared with the other aliases of the attachment.
    pub fn state(&self) -> &ObjectState {
        &self.state
    }

    /// The interception key guarding this alias.
    pub fn key(&self) -> &InjectionKey {
        &self.key
    }

    /// Re-entrant per-handle lock serializing scope rewrites.
    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutex.lock()
    }

    /// Builds (or reuses) the value and rewrites the scope, as a read would.
    ///
    /// Returns whether a value is now bound to the alias. For a dynamic
    /// handle the next comparison of its key is a plain match, so the next
    /// read observes the value built here instead of building again.
    ///
    /// A handle that is no longer installed under its alias (it was read
    /// and frozen, replaced by a later attachment, or overwritten) does
    /// nothing and returns `Ok(false)`.
    pub fn inject(&self) -> InjectResult<bool> {
        let scope = self
            .state
            .scope()
            .upgrade()
            .ok_or_else(|| InjectError::NotFound(self.alias.to_string()))?;

        let _guard = self.mutex.lock();
        if !scope.is_installed(self) {
            tracing::debug!(alias = %self.alias, "inject() on a handle that is no longer installed");
            return Ok(false);
        }
        let built = self.trigger(&scope)?;
        if built.is_some() && self.dynamic {
            self.key.arm();
        }
        Ok(built.is_some())
    }

    /// Materializes through the shared record, then rewrites the scope entry.
    ///
    /// Without a value (a lenient guard swallowed a re-entrant read) the
    /// entry is left as is, so the outer construction alone rewrites it. With
    /// a value the alias is bound to it, behind a fresh trap when dynamic.
    pub(crate) fn trigger(&self, scope: &Scope) -> InjectResult<Option<AnyArc>> {
        let built = self.state.materialize(self, scope)?;

        let _marker = ReentrancyMarker::enter(self.id);
        let _guard = self.mutex.lock();

        let displaced = match &built {
            None => None,
            Some(value) => {
                let slot = match self.key.handle() {
                    Some(this) if self.dynamic => Slot::Trap {
                        early: this,
                        value: Some(value.clone()),
                    },
                    _ => Slot::Value(value.clone()),
                };
                scope.put_slot(self.alias.clone(), slot)
            }
        };

        tracing::debug!(
            alias = %self.alias,
            built = built.is_some(),
            dynamic = self.dynamic,
            "scope entry rewritten"
        );

        // Displaced entries may run user destructors; the marker is still set
        drop(displaced);
        Ok(built)
    }
}

impl fmt::Display for EarlyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<EarlyObject ({} before inject())>", self.debug_info)
    }
}

impl fmt::Debug for EarlyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EarlyObject")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("dynamic", &self.dynamic)
            .field("state", &self.state)
            .finish()
    }
}
