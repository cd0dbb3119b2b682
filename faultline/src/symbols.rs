//! Stack-capture capability.
//!
//! Three small primitives sit behind this boundary: capturing return
//! addresses, resolving the code range of a function, and resolving a
//! function address by name. On glibc targets they map to `backtrace(3)`
//! and the `dladdr`/`dlsym` family; everywhere else they report
//! "unavailable", and stack points simply cannot be enabled.

use std::ptr;

use once_cell::sync::Lazy;

use crate::point::StackTarget;

/// Most return addresses a capture will report.
pub(crate) const MAX_FRAMES: usize = 100;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod imp {
    use std::ffi::CString;
    use std::mem;
    use std::ptr;

    use libc::{c_int, c_void};

    /// Ask `dladdr1` for the symbol-table entry (RTLD_DL_SYMENT in glibc's
    /// `dlfcn.h`).
    const RTLD_DL_SYMENT: c_int = 1;

    #[cfg(target_pointer_width = "64")]
    type ElfSym = libc::Elf64_Sym;
    #[cfg(target_pointer_width = "32")]
    type ElfSym = libc::Elf32_Sym;

    pub(crate) fn capture(frames: &mut [*mut c_void]) -> usize {
        let captured = unsafe { libc::backtrace(frames.as_mut_ptr(), frames.len() as c_int) };
        captured.max(0) as usize
    }

    /// Start address of the function containing `pc`, if the symbol can be
    /// resolved.
    pub(crate) fn func_start(pc: usize) -> Option<usize> {
        let mut info: libc::Dl_info = unsafe { mem::zeroed() };
        let found = unsafe { libc::dladdr(pc as *const c_void, &mut info) };
        if found == 0 || info.dli_saddr.is_null() {
            None
        } else {
            Some(info.dli_saddr as usize)
        }
    }

    /// End address of the function starting at `func`, from the symbol's
    /// recorded size.
    pub(crate) fn func_end(func: usize) -> Option<usize> {
        let mut info: libc::Dl_info = unsafe { mem::zeroed() };
        let mut sym: *mut c_void = ptr::null_mut();
        let found = unsafe {
            libc::dladdr1(
                func as *const c_void,
                &mut info,
                &mut sym,
                RTLD_DL_SYMENT,
            )
        };
        if found == 0 || sym.is_null() || info.dli_saddr.is_null() {
            return None;
        }
        let size = unsafe { (*(sym as *const ElfSym)).st_size } as usize;
        Some(func + size)
    }

    pub(crate) fn func_addr(name: &str) -> Option<usize> {
        let name = CString::new(name).ok()?;
        let addr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
        if addr.is_null() { None } else { Some(addr as usize) }
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
mod imp {
    //! Inert fallback for platforms without backtrace support: nothing is
    //! ever captured or resolved, so the works-probe reports false and
    //! stack points are refused at enable time.

    use std::ffi::c_void;

    pub(crate) fn capture(_frames: &mut [*mut c_void]) -> usize {
        0
    }

    pub(crate) fn func_start(_pc: usize) -> Option<usize> {
        None
    }

    pub(crate) fn func_end(_func: usize) -> Option<usize> {
        None
    }

    pub(crate) fn func_addr(_name: &str) -> Option<usize> {
        None
    }
}

pub(crate) use imp::{capture, func_addr, func_end, func_start};

/// Whether capturing frames and resolving our own code range actually works
/// here. Computed once on first use; the answer cannot change afterwards.
pub(crate) fn backtrace_works() -> bool {
    static WORKS: Lazy<bool> = Lazy::new(probe);
    *WORKS
}

/// Looks for this function's own frame in a capture, the same check a stack
/// point will run later. Must not be inlined or there is no frame to find.
#[inline(never)]
fn probe() -> bool {
    let mut frames = [ptr::null_mut(); MAX_FRAMES];
    let captured = capture(&mut frames);
    if captured == 0 {
        return false;
    }

    let target = (probe as fn() -> bool) as usize;
    let start = func_start(target);
    let end = func_end(target);
    if start.is_none() && end.is_none() {
        return false;
    }

    frames[..captured].iter().any(|&pc| {
        let pc = pc as usize;
        match end {
            Some(end) => pc >= start.unwrap_or(target) && pc <= end,
            None => func_start(pc) == start,
        }
    })
}

/// Does the captured call stack contain `target`, at the requested frame
/// position (or anywhere, for -1)?
pub(crate) fn frame_hits_target(target: &StackTarget) -> bool {
    let mut frames = [ptr::null_mut(); MAX_FRAMES];
    let captured = capture(&mut frames);
    frames[..captured].iter().enumerate().any(|(index, &pc)| {
        pc_in_target(pc as usize, target)
            && (target.pos_in_stack == -1 || index as i32 == target.pos_in_stack)
    })
}

fn pc_in_target(pc: usize, target: &StackTarget) -> bool {
    match target.end {
        Some(end) => pc >= target.start && pc <= end,
        None => func_start(pc) == Some(target.start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_is_stable() {
        // Whatever the platform answers, it must answer the same thing
        // twice and not crash doing it.
        assert_eq!(backtrace_works(), backtrace_works());
    }

    #[test]
    fn capture_reports_frames_when_supported() {
        let mut frames = [std::ptr::null_mut(); MAX_FRAMES];
        let captured = capture(&mut frames);
        if backtrace_works() {
            assert!(captured > 0);
        }
        assert!(captured <= MAX_FRAMES);
    }
}
