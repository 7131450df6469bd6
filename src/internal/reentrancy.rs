//! Thread-local re-entrancy tracking for placeholder handles.

use std::cell::RefCell;

// Handles whose scope rewrite is currently running on this thread
thread_local! {
    static REWRITING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a handle as rewriting its scope for the lifetime of the guard.
///
/// Interception keys consult the marker: a comparison that happens while the
/// owning handle is already rewriting the scope on the same thread reports a
/// plain match instead of triggering construction again.
pub(crate) struct ReentrancyMarker {
    handle: usize,
}

impl ReentrancyMarker {
    pub(crate) fn enter(handle: usize) -> Self {
        REWRITING.with(|stack| stack.borrow_mut().push(handle));
        Self { handle }
    }

    /// Whether `handle` is rewriting its scope on the calling thread.
    pub(crate) fn is_set(handle: usize) -> bool {
        REWRITING.with(|stack| stack.borrow().contains(&handle))
    }
}

impl Drop for ReentrancyMarker {
    fn drop(&mut self) {
        REWRITING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|&h| h == self.handle) {
                stack.remove(pos);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_is_scoped_to_guard() {
        assert!(!ReentrancyMarker::is_set(7));
        {
            let _outer = ReentrancyMarker::enter(7);
            assert!(ReentrancyMarker::is_set(7));
            {
                let _inner = ReentrancyMarker::enter(7);
                assert!(ReentrancyMarker::is_set(7));
            }
            assert!(ReentrancyMarker::is_set(7));
        }
        assert!(!ReentrancyMarker::is_set(7));
    }

    #[test]
    fn marker_is_thread_local() {
        let _marker = ReentrancyMarker::enter(11);
        let seen = std::thread::spawn(|| ReentrancyMarker::is_set(11))
            .join()
            .unwrap();
        assert!(!seen);
        assert!(ReentrancyMarker::is_set(11));
    }
}
