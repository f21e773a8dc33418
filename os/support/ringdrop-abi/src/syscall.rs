//! Userland-side syscall stubs.

use crate::syscall_abi::Sysno;

/// Print a NUL-terminated string through the kernel.
///
/// The kernel reads the bytes from the caller's address space up to the first
/// NUL (with a kernel-side length cap).
#[inline(always)]
#[allow(clippy::inline_always)]
#[must_use]
pub fn print_cstr(s: &core::ffi::CStr) -> u64 {
    let ret: u64;
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rdi") Sysno::PrintString as u64 => _,
            inlateout("rsi") s.as_ptr() as u64 => _,
            lateout("rax") ret,
            lateout("rcx") _, // clobbered by SYSCALL
            lateout("r11") _, // clobbered by SYSCALL
            options(nostack)
        );
    }
    ret
}

/// Print an unsigned integer in decimal through the kernel.
#[inline(always)]
#[allow(clippy::inline_always)]
#[must_use]
pub fn print_u64(value: u64) -> u64 {
    let ret: u64;
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rdi") Sysno::PrintInteger as u64 => _,
            inlateout("rsi") value => _,
            lateout("rax") ret,
            lateout("rcx") _, // clobbered by SYSCALL
            lateout("r11") _, // clobbered by SYSCALL
            options(nostack)
        );
    }
    ret
}
