//! # QEMU debug-port output
//!
//! Byte-at-a-time output to QEMU's debug console (I/O port `0x402`), the
//! only output channel available to the kernel on every code path from
//! the first instruction onward. Run QEMU with `-debugcon stdio` (or
//! `file:...`) to capture it on the host.
//!
//! Two layers:
//!
//! - [`qemu_trace!`]: direct, no-allocation formatted output, usable from
//!   any context including fault handlers,
//! - [`QemuLogger`]: a `log::Log` backend over the same port, so the rest
//!   of the kernel logs through the standard facade.
//!
//! The `enabled` feature (default on) compiles the port access in; with
//! it off everything becomes a no-op, for images meant to run outside the
//! emulator. The port write itself is harmless on real hardware, where
//! `0x402` is conventionally unclaimed.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// QEMU's debug-console port.
    const QEMU_DEBUG_PORT: u16 = 0x402;

    /// Write a single byte to the debug port.
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn write_byte(b: u8) {
        unsafe { outb(QEMU_DEBUG_PORT, b) }
    }

    #[allow(clippy::inline_always)]
    #[inline(always)]
    unsafe fn outb(port: u16, val: u8) {
        unsafe {
            core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") val,
            options(nomem, preserves_flags)
            );
        }
    }

    /// An unbuffered `fmt::Write` over the debug port.
    pub struct DebugConsole;

    impl Write for DebugConsole {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for b in s.bytes() {
                write_byte(b);
            }
            Ok(())
        }

        #[inline]
        fn write_char(&mut self, c: char) -> fmt::Result {
            // UTF-8 encode without allocation.
            let mut buf = [0u8; 4];
            self.write_str(c.encode_utf8(&mut buf))
        }
    }

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best-effort; the sink itself cannot fail.
        let _ = fmt::write(&mut DebugConsole, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(_: fmt::Arguments) {}
}

/// Write raw bytes to the debug console, bypassing formatting. Used where
/// the payload is untrusted and need not be UTF-8.
#[cfg(feature = "enabled")]
pub fn write_bytes(bytes: &[u8]) {
    for &b in bytes {
        qemu_fmt::write_byte(b);
    }
}

#[cfg(not(feature = "enabled"))]
pub fn write_bytes(_bytes: &[u8]) {}

/// Formatted output straight to the debug port, `format!`-style, without
/// allocating.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
