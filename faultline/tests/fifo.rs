//! Remote control over the named-pipe pair, end to end.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};

#[test]
fn fifo_round_trip() {
    faultline::init().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("ctl");
    faultline::rc_fifo(&base).unwrap();

    let pid = std::process::id();
    let in_path = dir.path().join(format!("ctl-{pid}.in"));
    let out_path = dir.path().join(format!("ctl-{pid}.out"));
    assert!(in_path.exists());
    assert!(out_path.exists());

    // Blocks until the worker has the read side open.
    let mut requests = OpenOptions::new().write(true).open(&in_path).unwrap();
    requests
        .write_all(b"enable name=fifo/p,failnum=11\n")
        .unwrap();

    let mut replies = BufReader::new(OpenOptions::new().read(true).open(&out_path).unwrap());
    let mut reply = String::new();
    replies.read_line(&mut reply).unwrap();
    assert_eq!(reply, "0\n");
    assert_eq!(faultline::fail("fifo/p"), 11);

    // Same connection, more commands.
    requests.write_all(b"disable name=fifo/p\n").unwrap();
    reply.clear();
    replies.read_line(&mut reply).unwrap();
    assert_eq!(reply, "0\n");
    assert_eq!(faultline::fail("fifo/p"), 0);

    // Errors come back as a negative status, and the worker keeps serving.
    requests.write_all(b"disable name=fifo/p\n").unwrap();
    reply.clear();
    replies.read_line(&mut reply).unwrap();
    assert_eq!(reply, "-1\n");

    requests
        .write_all(b"enable name=fifo/q,failnum=2\n")
        .unwrap();
    reply.clear();
    replies.read_line(&mut reply).unwrap();
    assert_eq!(reply, "0\n");
    assert_eq!(faultline::fail("fifo/q"), 2);
    faultline::disable("fifo/q").unwrap();
}
