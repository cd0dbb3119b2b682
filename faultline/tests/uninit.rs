//! Behavior before `init`: `fail` is a silent no-op, the control API is not.
//!
//! Kept in its own binary so no other test can have initialized the
//! process-global registry first.

use faultline::{Error, PointFlags};

#[test]
fn before_and_after_init() {
    assert_eq!(faultline::fail("anything"), 0);
    assert!(matches!(
        faultline::enable("anything", 1, 0, PointFlags::empty()),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(
        faultline::disable("anything"),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(
        faultline::rc_string("enable name=anything"),
        Err(faultline::ControlError::Api(Error::NotInitialized))
    ));

    faultline::init().unwrap();
    faultline::enable("anything", 1, 0, PointFlags::empty()).unwrap();
    assert_eq!(faultline::fail("anything"), 1);
}
