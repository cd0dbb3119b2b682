//! The process-wide registry of enabled points of failure.
//!
//! Exactly one table per process, created by [`init`]. The `fail` path
//! shares the lock for reading; the enable/disable family takes it
//! exclusively. Point descriptors are reference-counted, so a reader that
//! found a point keeps a valid view of it even while a concurrent disable
//! removes it from the table.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{Error, Result};
use crate::guard::RecGuard;
use crate::point::{ExternalCb, FailInfo, Method, PointFlags, PointState, StackTarget};
use crate::prng;
use crate::symbols;
use crate::wtable::WildTable;

pub(crate) type PointTable = WildTable<Arc<PointState>>;

/// `None` until `init` runs.
static POINTS: RwLock<Option<PointTable>> = RwLock::new(None);

pub(crate) fn points() -> &'static RwLock<Option<PointTable>> {
    &POINTS
}

extern "C" fn reseed_in_child() {
    prng::seed();
}

/// Initializes the registry.
///
/// Idempotent: later calls are no-ops that succeed, so independent libraries
/// loaded into the same process can each call it without coordinating.
pub fn init() -> Result<()> {
    let _rec = RecGuard::pin();
    let mut table = POINTS.write();
    if table.is_some() {
        return Ok(());
    }

    let rc = unsafe {
        libc::pthread_atfork(None, None, Some(reseed_in_child as unsafe extern "C" fn()))
    };
    if rc != 0 {
        return Err(Error::ForkHook);
    }
    prng::seed();

    *table = Some(WildTable::new());
    log::debug!("point-of-failure registry initialized");
    Ok(())
}

fn check_point_args(name: &str, failnum: i32) -> Result<()> {
    if name.is_empty() {
        return Err(Error::EmptyName);
    }
    if failnum == 0 {
        return Err(Error::ZeroFailnum);
    }
    Ok(())
}

/// Inserts under the write lock, replacing any point with the same name.
fn insert(point: PointState) -> Result<()> {
    let _rec = RecGuard::pin();
    let name = point.name().to_owned();
    let mut table = POINTS.write();
    let table = table.as_mut().ok_or(Error::NotInitialized)?;
    table.set(&name, Arc::new(point));
    log::debug!("enabled point `{name}`");
    Ok(())
}

/// Makes `name` fail unconditionally.
pub fn enable(name: &str, failnum: i32, failinfo: FailInfo, flags: PointFlags) -> Result<()> {
    check_point_args(name, failnum)?;
    insert(PointState::new(name, failnum, failinfo, flags, Method::Always))
}

/// Makes `name` fail with the given probability, between 0 (never) and 1
/// (always). As a special case, -1 also means "always".
pub fn enable_random(
    name: &str,
    failnum: i32,
    failinfo: FailInfo,
    flags: PointFlags,
    probability: f64,
) -> Result<()> {
    check_point_args(name, failnum)?;
    let method = if probability == -1.0 {
        Method::Always
    } else if (0.0..=1.0).contains(&probability) {
        Method::Random { probability }
    } else {
        return Err(Error::InvalidProbability(probability));
    };
    insert(PointState::new(name, failnum, failinfo, flags, method))
}

/// Makes `name` fail whenever `decide` says so. See [`ExternalCb`] for the
/// callback contract.
pub fn enable_external(
    name: &str,
    failnum: i32,
    failinfo: FailInfo,
    flags: PointFlags,
    decide: ExternalCb,
) -> Result<()> {
    check_point_args(name, failnum)?;
    insert(PointState::new(
        name,
        failnum,
        failinfo,
        flags,
        Method::External { decide },
    ))
}

/// Makes `name` fail whenever the function whose code starts at `func_addr`
/// appears on the calling stack. Positions other than -1 ("any frame") are
/// not supported.
pub fn enable_stack(
    name: &str,
    failnum: i32,
    failinfo: FailInfo,
    flags: PointFlags,
    func_addr: usize,
    pos_in_stack: i32,
) -> Result<()> {
    check_point_args(name, failnum)?;
    if pos_in_stack != -1 {
        return Err(Error::UnsupportedStackPos(pos_in_stack));
    }
    if !symbols::backtrace_works() {
        return Err(Error::BacktraceUnavailable);
    }
    let end = symbols::func_end(func_addr);
    // Frame matching needs the target's code range or, failing that, working
    // per-frame symbol resolution; with neither the point could never fire.
    if end.is_none() && symbols::func_start(func_addr).is_none() {
        return Err(Error::BacktraceUnavailable);
    }
    let target = StackTarget {
        start: func_addr,
        end,
        pos_in_stack,
    };
    insert(PointState::new(
        name,
        failnum,
        failinfo,
        flags,
        Method::Stack { target },
    ))
}

/// Like [`enable_stack`], resolving the target function by symbol name.
pub fn enable_stack_by_name(
    name: &str,
    failnum: i32,
    failinfo: FailInfo,
    flags: PointFlags,
    func_name: &str,
    pos_in_stack: i32,
) -> Result<()> {
    if !symbols::backtrace_works() {
        return Err(Error::BacktraceUnavailable);
    }
    let func_addr =
        symbols::func_addr(func_name).ok_or_else(|| Error::UnknownSymbol(func_name.to_owned()))?;
    enable_stack(name, failnum, failinfo, flags, func_addr, pos_in_stack)
}

/// Makes `name` not fail, removing it from the registry.
pub fn disable(name: &str) -> Result<()> {
    let _rec = RecGuard::pin();
    let mut table = POINTS.write();
    let table = table.as_mut().ok_or(Error::NotInitialized)?;
    if table.del(name) {
        log::debug!("disabled point `{name}`");
        Ok(())
    } else {
        Err(Error::NotFound(name.to_owned()))
    }
}
