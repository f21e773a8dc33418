//! The one-way door into ring 3.
//!
//! `iretq` is the only instrument that can lower the privilege level and
//! switch stack and flags in one step. The frame is built by hand: SS,
//! RSP, RFLAGS, CS, RIP from the bottom up, with both selectors carrying
//! RPL 3. RSP starts at the entry address itself; the user stack page
//! sits directly below it, so the first push lands in bounds.

use crate::gdt;
use log::info;
use ringdrop_abi::window::USER_ENTRY;
use ringdrop_registers::rflags::Rflags;

/// Drop to ring 3 at [`USER_ENTRY`] and never come back.
///
/// # Safety
/// Everything the user program relies on must already be live: the user
/// address space in CR3, GDT/TSS/IDT loaded, syscall MSRs programmed and
/// the TLS block initialized. The boot stack is abandoned where it
/// stands.
pub unsafe fn enter_user_mode() -> ! {
    info!("entering ring 3 at {USER_ENTRY:#x}");
    unsafe {
        core::arch::asm!(
            "push {uds}",    // SS
            "push {entry}",  // RSP
            "push {rflags}", // RFLAGS, IF set
            "push {ucs}",    // CS
            "push {entry}",  // RIP
            "iretq",
            uds = in(reg) u64::from(gdt::USER_DS),
            entry = in(reg) USER_ENTRY,
            rflags = in(reg) Rflags::user_default().into_bits(),
            ucs = in(reg) u64::from(gdt::USER_CS),
            options(noreturn),
        )
    }
}
