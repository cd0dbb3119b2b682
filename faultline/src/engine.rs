//! The failure decision path.

use std::cell::Cell;

use crate::guard::RecGuard;
use crate::point::{FailInfo, PointFlags};
use crate::registry;

thread_local! {
    /// failinfo of the last point that fired on this thread.
    static LAST_FAILINFO: Cell<FailInfo> = const { Cell::new(0) };
}

/// Returns the failure status of `name`: 0 to proceed normally, or the
/// matching point's failnum to simulate a failure.
///
/// Safe to call before [`init`](crate::init), when it always returns 0, and
/// from inside any faultline entry point, where the recursion guard
/// short-circuits it to 0 without touching the registry lock.
pub fn fail(name: &str) -> i32 {
    let Some(_rec) = RecGuard::enter() else {
        return 0;
    };

    let table = registry::points().read();
    let Some(table) = table.as_ref() else {
        return 0;
    };
    let Some(point) = table.get(name) else {
        return 0;
    };

    // For a ONETIME point the mutex stays held across the evaluation, so no
    // two callers can both observe it unfired.
    let mut armed = None;
    if point.flags().contains(PointFlags::ONETIME) {
        let fired_once = point.fired_once.lock();
        if *fired_once {
            return 0;
        }
        armed = Some(fired_once);
    }

    if !point.should_fire() {
        return 0;
    }

    // Capture failnum before any lock is released; a concurrent disable must
    // not be able to race the return value.
    let failnum = point.failnum();
    LAST_FAILINFO.with(|last| last.set(point.failinfo()));
    if let Some(mut fired_once) = armed {
        *fired_once = true;
    }
    log::trace!("failing `{name}` on `{}` with {failnum}", point.name());
    failnum
}

/// failinfo of the last failure on the calling thread, or 0 if no point has
/// fired on it yet.
pub fn failinfo() -> FailInfo {
    LAST_FAILINFO.with(Cell::get)
}
