//! Remote control over named pipes.
//!
//! [`rc_fifo`]`("/tmp/ctl")` creates `/tmp/ctl-<pid>.in` and
//! `/tmp/ctl-<pid>.out` and serves the line protocol on a dedicated thread:
//! one command line in, one decimal status line out. Both pipes are removed
//! at process exit, and a forked child gets a fresh pair under its own pid.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::thread;

use nix::errno::Errno;
use nix::sys::stat::Mode;
use parking_lot::Mutex;

use crate::errors::{Error, Result};
use crate::guard::RecGuard;

/// Longest accepted command line, in bytes.
const MAX_LINE: usize = 512;

/// Consecutive worker errors tolerated before the channel shuts down.
const MAX_ERRORS: u32 = 10;

struct Channel {
    base: OsString,
    input: PathBuf,
    output: PathBuf,
}

static CHANNEL: Mutex<Option<Channel>> = Mutex::new(None);

/// Enables remote control over a pair of named pipes whose paths start with
/// `basename`. `-<pid>.in` is appended for the request pipe and
/// `-<pid>.out` for the reply pipe; both are created with mode 0600 and
/// unlinked when the process exits. After a fork, the child re-creates the
/// pair under its own pid.
pub fn rc_fifo<P: AsRef<Path>>(basename: P) -> Result<()> {
    let _rec = RecGuard::pin();
    create_channel(basename.as_ref().as_os_str())?;

    static FORK_HOOK: Once = Once::new();
    let mut hook = Ok(());
    FORK_HOOK.call_once(|| {
        let rc = unsafe {
            libc::pthread_atfork(None, None, Some(respawn_in_child as unsafe extern "C" fn()))
        };
        if rc != 0 {
            hook = Err(Error::ForkHook);
        }
    });
    hook
}

fn create_channel(base: &OsStr) -> Result<()> {
    let pid = std::process::id();
    let input = pipe_path(base, pid, "in");
    let output = pipe_path(base, pid, "out");

    make_fifo(&input)?;
    if let Err(e) = make_fifo(&output) {
        let _ = fs::remove_file(&input);
        return Err(e);
    }

    *CHANNEL.lock() = Some(Channel {
        base: base.to_os_string(),
        input: input.clone(),
        output: output.clone(),
    });

    static EXIT_HOOK: Once = Once::new();
    EXIT_HOOK.call_once(|| {
        unsafe { libc::atexit(unlink_pipes) };
    });

    let spawned = thread::Builder::new()
        .name("faultline-rc".into())
        .spawn(move || worker(input, output));
    if let Err(e) = spawned {
        let path = unlink_now();
        return Err(Error::Channel {
            path: path.unwrap_or_default(),
            source: e,
        });
    }
    Ok(())
}

fn pipe_path(base: &OsStr, pid: u32, suffix: &str) -> PathBuf {
    let mut path = base.to_os_string();
    path.push(format!("-{pid}.{suffix}"));
    PathBuf::from(path)
}

fn make_fifo(path: &Path) -> Result<()> {
    match nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(errno) => Err(Error::Channel {
            path: path.to_owned(),
            source: io::Error::from_raw_os_error(errno as i32),
        }),
    }
}

extern "C" fn unlink_pipes() {
    let _ = unlink_now();
}

/// Best-effort removal of the current pipe pair. Returns the input path for
/// error reporting. Uses `try_lock` so it stays safe from the exit and
/// fork hooks even if some thread died holding the channel lock.
fn unlink_now() -> Option<PathBuf> {
    let channel = CHANNEL.try_lock()?;
    let channel = channel.as_ref()?;
    let _ = fs::remove_file(&channel.input);
    let _ = fs::remove_file(&channel.output);
    Some(channel.input.clone())
}

extern "C" fn respawn_in_child() {
    let base = CHANNEL
        .try_lock()
        .and_then(|channel| channel.as_ref().map(|c| c.base.clone()));
    if let Some(base) = base {
        if let Err(e) = create_channel(&base) {
            log::error!("remote control: could not re-create pipes after fork: {e}");
        }
    }
}

fn worker(input: PathBuf, output: PathBuf) {
    // Pinned for the whole loop: commands this thread runs must never trip
    // failure points themselves, or enabling a broad wildcard would brick
    // the channel that could undo it.
    let _rec = RecGuard::pin();

    let mut errors = 0u32;
    while errors <= MAX_ERRORS {
        // Both opens block until the peer end shows up.
        let reader = match File::open(&input) {
            Ok(file) => file,
            Err(e) => {
                log::error!("remote control: cannot open {}: {e}", input.display());
                return;
            }
        };
        let mut reader = BufReader::new(reader);
        let mut writer = match OpenOptions::new().write(true).open(&output) {
            Ok(file) => file,
            Err(e) => {
                log::error!("remote control: cannot open {}: {e}", output.display());
                return;
            }
        };

        loop {
            match read_line(&mut reader) {
                // Writer side went away; reopen and wait for the next one.
                Ok(None) => break,
                Ok(Some(line)) => {
                    let status = match crate::rc_string(&line) {
                        Ok(()) => 0,
                        Err(e) => {
                            log::debug!("remote control: rejected `{line}`: {e}");
                            -1
                        }
                    };
                    if writeln!(writer, "{status}").is_err() {
                        break;
                    }
                    errors = 0;
                }
                Err(e) if e.kind() == ErrorKind::BrokenPipe => break,
                Err(e) => {
                    log::warn!("remote control: read error: {e}");
                    errors += 1;
                    break;
                }
            }
        }
    }
    log::error!("remote control: too many consecutive errors, shutting down");
}

/// Reads one `\n`-terminated line of at most [`MAX_LINE`] bytes. `Ok(None)`
/// means the writer closed before sending anything.
fn read_line(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            if line.is_empty() {
                return Ok(None);
            }
            break;
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
        if line.len() >= MAX_LINE {
            break;
        }
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}
