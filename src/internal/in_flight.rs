//! In-flight construction tokens.

use std::collections::HashSet;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

/// Set of (handle, thread) pairs currently running a factory.
#[derive(Default)]
pub(crate) struct InFlightSet {
    running: Mutex<HashSet<(usize, ThreadId)>>,
}

impl InFlightSet {
    /// Marks `handle` as constructing on the calling thread.
    ///
    /// Returns `None` when this thread already holds the token, i.e. the
    /// factory re-entered its own construction.
    pub(crate) fn enter(&self, handle: usize) -> Option<InFlight<'_>> {
        let token = (handle, thread::current().id());
        if self.running.lock().insert(token) {
            Some(InFlight { set: self, token })
        } else {
            None
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.running.lock().is_empty()
    }
}

/// Clears its token on drop, including during unwinding.
pub(crate) struct InFlight<'a> {
    set: &'a InFlightSet,
    token: (usize, ThreadId),
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.running.lock().remove(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_reentry_is_refused() {
        let set = InFlightSet::default();
        let first = set.enter(1);
        assert!(first.is_some());
        assert!(set.enter(1).is_none());
        assert!(set.enter(2).is_some());
        drop(first);
        assert!(set.enter(1).is_some());
        assert!(set.is_empty());
    }

    #[test]
    fn other_threads_may_enter() {
        let set = InFlightSet::default();
        let _held = set.enter(1).unwrap();
        std::thread::scope(|s| {
            let entered = s.spawn(|| set.enter(1).is_some()).join().unwrap();
            assert!(entered);
        });
    }

    #[test]
    fn token_cleared_on_panic() {
        let set = InFlightSet::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _token = set.enter(3).unwrap();
            panic!("factory blew up");
        }));
        assert!(result.is_err());
        assert!(set.is_empty());
    }
}
