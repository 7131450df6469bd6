//! Injections that read ambient, per-context state on every access.
//!
//! A context injection is a dynamic, rebuild-every-access injection whose
//! factory reads the current value of a context source: a thread-local, a
//! shared cell, or (with the `async` feature) a tokio task-local. The alias
//! therefore always reflects the context of the reader.

use std::any::type_name;
use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{InjectError, InjectResult};
use crate::injection::{self, Injection};
use crate::scope::Scope;

/// Source of the current value of some ambient state.
pub trait ContextSource<T>: Send + Sync + 'static {
    /// The value visible from the calling context.
    ///
    /// # Errors
    ///
    /// [`InjectError::ContextUnavailable`] when the context cannot be read
    /// from here, e.g. a task-local read outside its task.
    fn current(&self) -> InjectResult<T>;
}

impl<T> ContextSource<T> for &'static std::thread::LocalKey<RefCell<T>>
where
    T: Clone + 'static,
{
    fn current(&self) -> InjectResult<T> {
        self.try_with(|cell| cell.try_borrow().map(|value| value.clone()).ok())
            .ok()
            .flatten()
            .ok_or(InjectError::ContextUnavailable("thread-local"))
    }
}

impl<T> ContextSource<T> for Arc<RwLock<T>>
where
    T: Clone + Send + Sync + 'static,
{
    fn current(&self) -> InjectResult<T> {
        Ok(self.read().clone())
    }
}

#[cfg(feature = "async")]
impl<T> ContextSource<T> for &'static tokio::task::LocalKey<T>
where
    T: Clone + 'static,
{
    fn current(&self) -> InjectResult<T> {
        self.try_with(T::clone)
            .map_err(|_| InjectError::ContextUnavailable("task-local"))
    }
}

/// Builds an injection that re-reads `source` on every access.
///
/// The injection rebuilds on every pass and keeps its placeholder installed,
/// so each read observes the reader's current context. With `into` set it is
/// attached immediately under `aliases`.
///
/// # Examples
///
/// ```rust
/// use scope_inject::{context_injection, Scope};
/// use std::cell::RefCell;
///
/// thread_local! {
///     static REQUEST_ID: RefCell<u64> = RefCell::new(0);
/// }
///
/// let scope = Scope::new();
/// context_injection::<u64, _>(&["request_id"], Some(&scope), &REQUEST_ID).unwrap();
///
/// REQUEST_ID.with(|id| *id.borrow_mut() = 7);
/// assert_eq!(*scope.get::<u64>("request_id").unwrap(), 7);
///
/// REQUEST_ID.with(|id| *id.borrow_mut() = 8);
/// assert_eq!(*scope.get::<u64>("request_id").unwrap(), 8);
/// ```
pub fn context_injection<T, S>(
    aliases: &[&str],
    into: Option<&Scope>,
    source: S,
) -> InjectResult<Injection<T>>
where
    T: Send + Sync + 'static,
    S: ContextSource<T>,
{
    let built = Injection::new(move || source.current())
        .once(false)
        .dynamic(true)
        .debug_info(format!("<context injection {}>", type_name::<T>()));
    injection::injection(aliases, into, built)
}
