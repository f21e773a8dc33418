//! Global IDT storage.
//!
//! The table must outlive the `lidt` that publishes it, so the built
//! [`Idt`] is moved into a static here and loaded from its final address.
//! Gates are never edited after load; the table is assembled completely
//! before the load, and the load itself enables interrupts.

use crate::interrupts::Idt;
use core::mem::MaybeUninit;

/// The interrupt descriptor table the CPU walks.
static mut IDT: MaybeUninit<Idt> = MaybeUninit::uninit();

/// Move `idt` into static storage, load it into IDTR and enable
/// interrupts in the same step.
///
/// # Safety
/// Call exactly once, with GDT and TSS already installed (a gate firing
/// from ring 3 needs `rsp0`). Delivery through the table can begin
/// immediately; any source armed later must target a present gate.
pub unsafe fn init_idt_once(idt: Idt) {
    #[allow(static_mut_refs)]
    unsafe {
        IDT.write(idt);
        IDT.assume_init_ref().load_and_enable();
    }
}
