//! Segment-register reloads after a GDT switch.
//!
//! Loading GDTR changes nothing by itself; the segment registers keep
//! their cached descriptors until reloaded. Data segments take a plain
//! `mov`, CS only changes through a control transfer, here a far return.

/// Load `selector` into DS, ES and SS.
///
/// # Safety
/// CPL0 only. `selector` must name a present writable data segment in the
/// live GDT; SS in particular is validated against CPL on the spot.
#[cfg(feature = "asm")]
#[inline]
pub unsafe fn load_data_segments(selector: u16) {
    unsafe {
        core::arch::asm!(
            "mov ds, {0:x}",
            "mov es, {0:x}",
            "mov ss, {0:x}",
            in(reg) selector,
            options(nostack, preserves_flags)
        );
    }
}

/// Reload CS with `selector` by far-returning to the next instruction.
///
/// # Safety
/// CPL0 only. `selector` must name a present 64-bit code segment in the
/// live GDT whose DPL matches the current privilege level.
#[cfg(feature = "asm")]
pub unsafe fn reload_code_segment(selector: u16) {
    unsafe {
        core::arch::asm!(
            "push {sel}",
            "lea {tmp}, [rip + 2f]",
            "push {tmp}",
            "retfq",
            "2:",
            sel = in(reg) u64::from(selector),
            tmp = out(reg) _,
            options(preserves_flags)
        );
    }
}
