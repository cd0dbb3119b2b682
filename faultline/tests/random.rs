//! Probabilistic points: bounds and empirical firing rate.

use faultline::PointFlags;

#[test]
fn probability_zero_never_fires() {
    faultline::init().unwrap();
    faultline::enable_random("rng/zero", 1, 0, PointFlags::empty(), 0.0).unwrap();
    assert!((0..100_000).all(|_| faultline::fail("rng/zero") == 0));
    faultline::disable("rng/zero").unwrap();
}

#[test]
fn probability_one_always_fires() {
    faultline::init().unwrap();
    faultline::enable_random("rng/one", 2, 0, PointFlags::empty(), 1.0).unwrap();
    // Draws land in [0, 1] inclusive, so p == 1.0 can in principle miss on
    // an exact 1.0 draw; over 10^4 calls that is one-in-forever and the
    // observed rate must still be overwhelming.
    let fired = (0..10_000).filter(|_| faultline::fail("rng/one") != 0).count();
    assert!(fired >= 9_999, "fired only {fired} times");
    faultline::disable("rng/one").unwrap();
}

#[test]
fn probability_sentinel_always_fires() {
    faultline::init().unwrap();
    faultline::enable_random("rng/always", 6, 0, PointFlags::empty(), -1.0).unwrap();
    assert!((0..10_000).all(|_| faultline::fail("rng/always") == 6));
    faultline::disable("rng/always").unwrap();
}

#[test]
fn quarter_probability_rate() {
    faultline::init().unwrap();
    faultline::enable_random("rng/quarter", 1, 0, PointFlags::empty(), 0.25).unwrap();
    let fired = (0..1_000_000)
        .filter(|_| faultline::fail("rng/quarter") != 0)
        .count();
    assert!(
        (247_000..=253_000).contains(&fired),
        "fired {fired} times out of 1e6"
    );
    faultline::disable("rng/quarter").unwrap();
}
