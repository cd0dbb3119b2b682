//! PRNG reseeding in the forked child.
//!
//! A probabilistic point doubles as a window into the generator: each call
//! maps one draw to a fire/no-fire bit. After a fork, the child must
//! produce its own sequence, not replay the parent's.
//!
//! One test, alone in its binary: the child must not inherit stray test
//! threads holding registry locks.

#![cfg(unix)]

use faultline::PointFlags;

const BITS: usize = 32;

fn draw_bits() -> Vec<u8> {
    (0..BITS)
        .map(|_| u8::from(faultline::fail("fork/prng") != 0))
        .collect()
}

#[test]
fn child_reseeds_prng() {
    faultline::init().unwrap();
    faultline::enable_random("fork/prng", 1, 0, PointFlags::empty(), 0.5).unwrap();

    let mut fds = [0i32; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

    let pid = unsafe { libc::fork() };
    assert!(pid >= 0, "fork failed");

    if pid == 0 {
        // Child: report the first draws and leave without touching any
        // libtest machinery.
        let bits = draw_bits();
        unsafe {
            libc::close(fds[0]);
            libc::write(fds[1], bits.as_ptr().cast(), bits.len());
            libc::_exit(0);
        }
    }

    unsafe { libc::close(fds[1]) };
    let parent_bits = draw_bits();

    let mut child_bits = [0u8; BITS];
    let mut received = 0usize;
    while received < BITS {
        let n = unsafe {
            libc::read(
                fds[0],
                child_bits[received..].as_mut_ptr().cast(),
                BITS - received,
            )
        };
        assert!(n > 0, "child pipe closed after {received} bytes");
        received += n as usize;
    }
    unsafe { libc::close(fds[0]) };

    let mut status = 0i32;
    assert_eq!(unsafe { libc::waitpid(pid, &mut status, 0) }, pid);

    assert_ne!(
        parent_bits,
        child_bits.to_vec(),
        "child kept the parent's PRNG sequence"
    );
    faultline::disable("fork/prng").unwrap();
}
