//! Syscall dispatch.
//!
//! Two calls exist: print a NUL-terminated string and print an integer,
//! both onto the debug console. The dispatcher trusts nothing about the
//! string argument; the pointer and every byte of the string must lie
//! inside the user window, and a terminator must appear within
//! [`MAX_PRINT_BYTES`]. Malformed input prints nothing and reports
//! failure.

pub mod entry;

use log::warn;
use ringdrop_abi::syscall_abi::Sysno;
use ringdrop_abi::window::{PAGE_SIZE, USER_WINDOW_BASE, USER_WINDOW_SLOTS};
use ringdrop_qemu::qemu_trace;

/// Longest string a single [`Sysno::PrintString`] will emit.
pub const MAX_PRINT_BYTES: u64 = PAGE_SIZE;

/// First address past the user window.
const WINDOW_END: u64 = USER_WINDOW_BASE + (USER_WINDOW_SLOTS as u64) * PAGE_SIZE;

/// Dispatch one syscall. Returns 0 on success, `u64::MAX` for an
/// unrecognized number or a rejected argument.
pub fn syscall(sysno: u64, arg0: u64, _arg1: u64, _arg2: u64, _arg3: u64, _arg4: u64) -> u64 {
    match sysno {
        x if x == Sysno::PrintString as u64 => print_user_string(arg0),
        x if x == Sysno::PrintInteger as u64 => {
            qemu_trace!("{arg0}\n");
            0
        }
        _ => {
            warn!("unrecognized syscall {sysno}");
            u64::MAX
        }
    }
}

/// Validate and print a NUL-terminated string from the user window.
///
/// The user tree is live in CR3 throughout a syscall, so window addresses
/// dereference directly; a touch of the demand page simply takes the
/// demand fault and resumes. The terminator is located before any byte is
/// printed, which keeps rejected input entirely off the console.
fn print_user_string(ptr: u64) -> u64 {
    if ptr < USER_WINDOW_BASE || ptr >= WINDOW_END {
        return u64::MAX;
    }
    let limit = WINDOW_END.min(ptr + MAX_PRINT_BYTES);

    let mut len: u64 = 0;
    loop {
        let addr = ptr + len;
        if addr >= limit {
            return u64::MAX;
        }
        let byte = unsafe { *(addr as *const u8) };
        if byte == 0 {
            break;
        }
        len += 1;
    }

    #[allow(clippy::cast_possible_truncation)]
    let bytes = unsafe { core::slice::from_raw_parts(ptr as *const u8, len as usize) };
    ringdrop_qemu::write_bytes(bytes);
    0
}
