//! Point-of-failure descriptors.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::prng;
use crate::symbols;

/// Opaque pointer-sized payload carried by a point and reported back through
/// [`failinfo`](crate::failinfo) after the point fires. Callers typically
/// stash an errno-like value or an index into their own state here.
pub type FailInfo = usize;

bitflags! {
    /// Behavior flags for a point of failure.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PointFlags: u32 {
        /// Fire at most once over the lifetime of the point.
        const ONETIME = 1;
    }
}

/// Decision callback for externally-controlled points.
///
/// Receives the point name and mutable views of its failnum, failinfo and
/// flags; returning `true` makes the point fire. Mutations are written back
/// to the point and stick for later evaluations.
///
/// The callback runs with the registry's read lock held: it may call
/// [`fail`](crate::fail) (which short-circuits to 0) but must not call the
/// `enable*`/`disable` family.
pub type ExternalCb =
    Arc<dyn Fn(&str, &mut i32, &mut FailInfo, &mut PointFlags) -> bool + Send + Sync>;

/// Code range a stack point looks for in the captured frames.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackTarget {
    pub(crate) start: usize,
    /// `None` when the platform cannot report symbol sizes; matching then
    /// falls back to comparing symbol start addresses per frame.
    pub(crate) end: Option<usize>,
    /// -1 matches the target at any frame index.
    pub(crate) pos_in_stack: i32,
}

pub(crate) enum Method {
    Always,
    Random { probability: f64 },
    External { decide: ExternalCb },
    Stack { target: StackTarget },
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Always => f.write_str("Always"),
            Method::Random { probability } => write!(f, "Random({probability})"),
            Method::External { .. } => f.write_str("External"),
            Method::Stack { target } => write!(f, "Stack({target:?})"),
        }
    }
}

pub(crate) struct PointState {
    name: String,
    failnum: AtomicI32,
    failinfo: AtomicUsize,
    flags: AtomicU32,
    /// Whether a ONETIME point has already fired. The mutex is held across
    /// the whole method evaluation, so exactly one caller can observe an
    /// unfired point and proceed; non-ONETIME points never touch it.
    pub(crate) fired_once: Mutex<bool>,
    pub(crate) method: Method,
}

impl PointState {
    pub(crate) fn new(
        name: &str,
        failnum: i32,
        failinfo: FailInfo,
        flags: PointFlags,
        method: Method,
    ) -> Self {
        Self {
            name: name.to_owned(),
            failnum: AtomicI32::new(failnum),
            failinfo: AtomicUsize::new(failinfo),
            flags: AtomicU32::new(flags.bits()),
            fired_once: Mutex::new(false),
            method,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn failnum(&self) -> i32 {
        self.failnum.load(Ordering::Relaxed)
    }

    pub(crate) fn failinfo(&self) -> FailInfo {
        self.failinfo.load(Ordering::Relaxed)
    }

    pub(crate) fn flags(&self) -> PointFlags {
        PointFlags::from_bits_retain(self.flags.load(Ordering::Relaxed))
    }

    /// Runs the point's decision method; `true` means fire.
    pub(crate) fn should_fire(&self) -> bool {
        match &self.method {
            Method::Always => true,
            Method::Random { probability } => *probability > prng::draw(),
            Method::External { decide } => {
                let mut failnum = self.failnum();
                let mut failinfo = self.failinfo();
                let mut flags = self.flags();
                let fire = decide(&self.name, &mut failnum, &mut failinfo, &mut flags);
                self.failnum.store(failnum, Ordering::Relaxed);
                self.failinfo.store(failinfo, Ordering::Relaxed);
                self.flags.store(flags.bits(), Ordering::Relaxed);
                fire
            }
            Method::Stack { target } => symbols::frame_hits_target(target),
        }
    }
}
