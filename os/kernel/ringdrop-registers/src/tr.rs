//! The task register.

/// Load the task register with `selector`, which must reference a 64-bit
/// TSS descriptor in the current GDT.
///
/// # Safety
/// CPL0 only. The GDT entry must be a valid, present TSS descriptor; the
/// CPU marks it busy as a side effect, so loading the same selector twice
/// without resetting the descriptor raises #GP.
#[cfg(feature = "asm")]
pub unsafe fn load_task_register(selector: u16) {
    unsafe {
        core::arch::asm!("ltr {0:x}", in(reg) selector, options(nostack, preserves_flags));
    }
}
