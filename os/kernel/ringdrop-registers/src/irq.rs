//! Interrupt-flag control and the halt idiom.

/// Clear the interrupt flag.
///
/// # Safety
/// CPL0 (or matching IOPL) only.
#[cfg(feature = "asm")]
#[inline]
pub unsafe fn disable_interrupts() {
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack));
    }
}

/// Halt until the next interrupt.
#[cfg(feature = "asm")]
#[inline]
pub fn halt() {
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }
}

/// Disable interrupts and halt for good. With the interrupt flag clear
/// only an NMI could wake the core, and the loop re-halts if one does.
#[cfg(feature = "asm")]
pub fn halt_forever() -> ! {
    unsafe {
        disable_interrupts();
    }
    loop {
        halt();
    }
}
