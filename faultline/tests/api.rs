//! Control-API behavior: enable/fail/disable round trips, wildcard and
//! shadowing rules, external callbacks, reentrancy.
//!
//! The registry is process-global and these tests run concurrently, so each
//! one sticks to its own point names.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use faultline::{Error, ExternalCb, PointFlags};

#[test]
fn init_is_idempotent() {
    faultline::init().unwrap();
    faultline::init().unwrap();
    faultline::init().unwrap();
}

#[test]
fn enable_fail_disable_round_trip() {
    faultline::init().unwrap();
    faultline::enable("io/read", 42, 0, PointFlags::empty()).unwrap();
    assert_eq!(faultline::fail("io/read"), 42);
    assert_eq!(faultline::fail("io/write"), 0);
    faultline::disable("io/read").unwrap();
    assert_eq!(faultline::fail("io/read"), 0);
}

#[test]
fn fail_keeps_returning_failnum_until_disabled() {
    faultline::init().unwrap();
    faultline::enable("sticky", 7, 21, PointFlags::empty()).unwrap();
    for _ in 0..100 {
        assert_eq!(faultline::fail("sticky"), 7);
        assert_eq!(faultline::failinfo(), 21);
    }
    faultline::disable("sticky").unwrap();
    assert_eq!(faultline::fail("sticky"), 0);
}

#[test]
fn wildcard_matches_and_exact_shadows() {
    faultline::init().unwrap();
    faultline::enable("net/*", 5, 0x1234, PointFlags::empty()).unwrap();
    assert_eq!(faultline::fail("net/connect"), 5);
    assert_eq!(faultline::failinfo(), 0x1234);

    faultline::enable("net/connect", 9, 0, PointFlags::empty()).unwrap();
    assert_eq!(faultline::fail("net/connect"), 9);
    assert_eq!(faultline::fail("net/other"), 5);

    faultline::disable("net/connect").unwrap();
    faultline::disable("net/*").unwrap();
    assert_eq!(faultline::fail("net/connect"), 0);
}

#[test]
fn wildcard_prefix_rules() {
    faultline::init().unwrap();
    faultline::enable("a/b/*", 7, 0, PointFlags::empty()).unwrap();
    assert_eq!(faultline::fail("a/b/x"), 7);
    assert_eq!(faultline::fail("a/b/x/y"), 7);
    assert_eq!(faultline::fail("a/c"), 0);
    faultline::disable("a/b/*").unwrap();
    assert_eq!(faultline::fail("a/b/x"), 0);
}

#[test]
fn external_callback_decides() {
    faultline::init().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let decide: ExternalCb = Arc::new(move |_name, _failnum, _failinfo, _flags| {
        seen.fetch_add(1, Ordering::SeqCst) + 1 == 3
    });
    faultline::enable_external("cb", 1, 0, PointFlags::empty(), decide).unwrap();

    let fired: Vec<i32> = (0..5).map(|_| faultline::fail("cb")).collect();
    assert_eq!(fired, vec![0, 0, 1, 0, 0]);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    faultline::disable("cb").unwrap();
}

#[test]
fn external_callback_mutations_stick() {
    faultline::init().unwrap();
    let decide: ExternalCb = Arc::new(|_name, failnum, failinfo, _flags| {
        *failnum += 1;
        *failinfo = 0xbeef;
        true
    });
    faultline::enable_external("cb/rewrite", 70, 0, PointFlags::empty(), decide).unwrap();

    // The callback bumps failnum before each firing, and the bump persists.
    assert_eq!(faultline::fail("cb/rewrite"), 71);
    assert_eq!(faultline::failinfo(), 0xbeef);
    assert_eq!(faultline::fail("cb/rewrite"), 72);
    faultline::disable("cb/rewrite").unwrap();
}

#[test]
fn nested_fail_from_callback_short_circuits() {
    faultline::init().unwrap();
    faultline::enable("nested/victim", 13, 0, PointFlags::empty()).unwrap();
    let decide: ExternalCb = Arc::new(|_name, _failnum, _failinfo, _flags| {
        // A nested fail() must not deadlock on the registry lock, and must
        // report "don't fail" even though the point is enabled.
        assert_eq!(faultline::fail("nested/victim"), 0);
        true
    });
    faultline::enable_external("nested", 2, 0, PointFlags::empty(), decide).unwrap();

    assert_eq!(faultline::fail("nested"), 2);
    assert_eq!(faultline::fail("nested/victim"), 13);
    faultline::disable("nested").unwrap();
    faultline::disable("nested/victim").unwrap();
}

#[test]
fn onetime_fires_once() {
    faultline::init().unwrap();
    faultline::enable("once/solo", 3, 0, PointFlags::ONETIME).unwrap();
    assert_eq!(faultline::fail("once/solo"), 3);
    assert_eq!(faultline::fail("once/solo"), 0);
    assert_eq!(faultline::fail("once/solo"), 0);
    faultline::disable("once/solo").unwrap();
}

#[test]
fn reenabling_rearms_a_onetime_point() {
    faultline::init().unwrap();
    faultline::enable("once/rearm", 4, 0, PointFlags::ONETIME).unwrap();
    assert_eq!(faultline::fail("once/rearm"), 4);
    assert_eq!(faultline::fail("once/rearm"), 0);
    faultline::enable("once/rearm", 4, 0, PointFlags::ONETIME).unwrap();
    assert_eq!(faultline::fail("once/rearm"), 4);
    faultline::disable("once/rearm").unwrap();
}

#[test]
fn overwrite_replaces_point() {
    faultline::init().unwrap();
    faultline::enable("swap", 1, 0, PointFlags::empty()).unwrap();
    faultline::enable("swap", 8, 0, PointFlags::empty()).unwrap();
    assert_eq!(faultline::fail("swap"), 8);
    faultline::disable("swap").unwrap();
    assert!(matches!(
        faultline::disable("swap"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn helper_macros() {
    faultline::init().unwrap();
    faultline::enable("macros/hit", 1, 0, PointFlags::empty()).unwrap();

    let mut ran = false;
    faultline::do_on!("macros/hit", ran = true);
    assert!(ran);

    fn guarded() -> Result<u32, i32> {
        faultline::return_on!("macros/hit", Err(-7));
        Ok(1)
    }
    assert_eq!(guarded(), Err(-7));

    faultline::disable("macros/hit").unwrap();
    assert_eq!(guarded(), Ok(1));
}

#[test]
fn validation_errors() {
    faultline::init().unwrap();
    assert!(matches!(
        faultline::enable("", 1, 0, PointFlags::empty()),
        Err(Error::EmptyName)
    ));
    assert!(matches!(
        faultline::enable("val/zero", 0, 0, PointFlags::empty()),
        Err(Error::ZeroFailnum)
    ));
    assert!(matches!(
        faultline::enable_random("val/prob", 1, 0, PointFlags::empty(), 1.5),
        Err(Error::InvalidProbability(_))
    ));
    assert!(matches!(
        faultline::disable("val/never-enabled"),
        Err(Error::NotFound(_))
    ));
    // Nothing was installed by the rejected calls.
    assert_eq!(faultline::fail("val/zero"), 0);
    assert_eq!(faultline::fail("val/prob"), 0);
}
