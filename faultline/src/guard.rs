// Re-entrancy guard for the public entry points.
// ----------------------------------------------
//   • One depth counter per thread, nothing shared.
//   • `fail()` refuses to run nested; everything else just holds the count.
//   • Restored automatically with RAII (`Drop`).
//
// The counter is what keeps the library from recursing into itself when it
// is loaded next to interposers that wrap libc: an allocation made while
// `enable` holds the write lock may itself consult a point of failure, and
// that nested `fail()` must return 0 without touching any lock.

use std::cell::Cell;

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// RAII handle for one level of library entry on the current thread.
pub(crate) struct RecGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl RecGuard {
    /// Try to enter the library from `fail()`.
    ///
    /// Returns `Some(RecGuard)` on first entry, or `None` when this thread
    /// is already inside a faultline entry point and the caller must
    /// short-circuit.
    #[inline]
    pub(crate) fn enter() -> Option<Self> {
        DEPTH.with(|depth| {
            if depth.get() > 0 {
                return None;
            }
            depth.set(1);
            Some(Self::new())
        })
    }

    /// Enter the library unconditionally, holding the count for the guard's
    /// lifetime. Used by the control paths, and by the FIFO worker, which
    /// keeps one pinned for its whole loop so the commands it runs can never
    /// trip failure points themselves.
    #[inline]
    pub(crate) fn pin() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self::new()
    }

    fn new() -> Self {
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for RecGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_reentry() {
        let outer = RecGuard::enter();
        assert!(outer.is_some());
        assert!(RecGuard::enter().is_none());
        drop(outer);
        assert!(RecGuard::enter().is_some());
    }

    #[test]
    fn pin_blocks_enter_until_dropped() {
        let pinned = RecGuard::pin();
        assert!(RecGuard::enter().is_none());
        drop(pinned);
        assert!(RecGuard::enter().is_some());
    }

    #[test]
    fn pins_nest() {
        let a = RecGuard::pin();
        let b = RecGuard::pin();
        drop(a);
        assert!(RecGuard::enter().is_none());
        drop(b);
        assert!(RecGuard::enter().is_some());
    }
}
