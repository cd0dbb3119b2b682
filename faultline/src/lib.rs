//! Runtime fault injection.
//!
//! Applications declare named *points of failure* and consult them with
//! [`fail`]; tests and operators decide at runtime which points fire and
//! how, through the in-process control interface ([`enable`],
//! [`enable_random`], [`enable_external`], [`enable_stack_by_name`],
//! [`disable`]) or externally through a named-pipe control channel
//! ([`rc_fifo`]) speaking a small line protocol ([`rc_string`]).
//!
//! Point names are hierarchical (`"io/read"`, `"net/connect"`), and a name
//! enabled with a trailing `*` matches every point it prefixes. A firing
//! point reports a caller-chosen non-zero `failnum` from `fail` and parks a
//! pointer-sized `failinfo` payload for [`failinfo`].
//!
//! ```no_run
//! use faultline::PointFlags;
//!
//! fn read_block(buf: &mut [u8]) -> Result<usize, i32> {
//!     let failnum = faultline::fail("storage/read");
//!     if failnum != 0 {
//!         return Err(failnum);
//!     }
//!     // ... the real read ...
//!     Ok(buf.len())
//! }
//!
//! fn main() -> faultline::Result<()> {
//!     faultline::init()?;
//!     faultline::enable("storage/*", 5, 0, PointFlags::empty())?;
//!     let mut buf = [0u8; 512];
//!     assert_eq!(read_block(&mut buf), Err(5));
//!     Ok(())
//! }
//! ```
//!
//! `fail` is designed to be cheap and safe to leave in production code
//! paths: with no matching point enabled it is one shared-lock acquisition
//! and a hash lookup, and it never panics, blocks on writers mid-evaluation,
//! or recurses into itself through interposed libc calls.

pub mod cache;
pub mod hash;
pub mod wtable;

mod control;
mod engine;
mod errors;
mod fifo;
mod guard;
mod point;
mod prng;
mod registry;
mod symbols;

pub use control::rc_string;
pub use engine::{fail, failinfo};
pub use errors::{ControlError, Error, Result};
pub use fifo::rc_fifo;
pub use point::{ExternalCb, FailInfo, PointFlags};
pub use registry::{
    disable, enable, enable_external, enable_random, enable_stack, enable_stack_by_name, init,
};

/// Runs `action` when the given point of failure fires.
///
/// ```no_run
/// faultline::do_on!("net/send", eprintln!("simulated send failure"));
/// ```
#[macro_export]
macro_rules! do_on {
    ($name:expr, $action:expr) => {
        if $crate::fail($name) != 0 {
            $action;
        }
    };
}

/// Returns `ret` from the enclosing function when the given point fires.
///
/// ```no_run
/// fn send(buf: &[u8]) -> std::io::Result<usize> {
///     faultline::return_on!(
///         "net/send",
///         Err(std::io::Error::from_raw_os_error(faultline::failinfo() as i32))
///     );
///     Ok(buf.len())
/// }
/// ```
#[macro_export]
macro_rules! return_on {
    ($name:expr, $ret:expr) => {
        if $crate::fail($name) != 0 {
            return $ret;
        }
    };
}

/// Exits the process when the given point fires.
#[macro_export]
macro_rules! exit_on {
    ($name:expr) => {
        if $crate::fail($name) != 0 {
            ::std::process::exit(1);
        }
    };
}
