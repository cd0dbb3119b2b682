//! Pseudorandom draws for probabilistic points.
//!
//! A linear congruential generator with the classic `rand()` coefficients.
//! `fail()` sits on application hot paths and the draws only gate simulated
//! failures, so a one-multiply generator is the right tool; it is neither
//! cryptographic nor strictly thread-safe. State lives in a relaxed atomic:
//! concurrent draws may clobber one another's step, which costs at most one
//! degenerate sample.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static STATE: AtomicU32 = AtomicU32::new(0xA673_F42D);

/// Seeds from the wall clock's microsecond component. Called at `init` and
/// again in the forked child, so parent and child do not share a sequence.
pub(crate) fn seed() {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_micros())
        .unwrap_or(0);
    STATE.store(micros, Ordering::Relaxed);
}

/// Next value in [0, 1].
pub(crate) fn draw() -> f64 {
    let x = STATE
        .load(Ordering::Relaxed)
        .wrapping_mul(1_103_515_245)
        .wrapping_add(12345);
    STATE.store(x, Ordering::Relaxed);
    f64::from(x) / f64::from(u32::MAX)
}

#[cfg(test)]
pub(crate) fn reseed_with(state: u32) {
    STATE.store(state, Ordering::Relaxed);
}
