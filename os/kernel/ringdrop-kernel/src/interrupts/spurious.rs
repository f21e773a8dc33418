//! Spurious-interrupt gate for the local APIC.
//!
//! The APIC can deliver its spurious vector when an interrupt is
//! deasserted at just the wrong moment. Such a delivery must not be
//! acknowledged: no EOI, no state, just an immediate return.

use crate::interrupts::{GateType, Idt};
use core::arch::naked_asm;

/// Must match the vector programmed into the spurious-vector register.
pub const SPURIOUS_VECTOR: u8 = 0xFF;

// Vectors below 0x10 belong to exceptions; hardware also forces the low
// nibble of the spurious vector on some APIC generations.
const _: () = assert!(SPURIOUS_VECTOR >= 0x10);

pub trait SpuriousInterrupt {
    fn init_spurious_gate(&mut self, handler: extern "C" fn()) -> &mut Self;
}

impl SpuriousInterrupt for Idt {
    fn init_spurious_gate(&mut self, handler: extern "C" fn()) -> &mut Self {
        self[usize::from(SPURIOUS_VECTOR)]
            .set_handler(handler)
            .present(true)
            .gate_type(GateType::InterruptGate);
        self
    }
}

/// A spurious delivery pushes a normal interrupt frame and expects nothing
/// back, so the stub is a bare `iretq`.
#[unsafe(naked)]
pub extern "C" fn spurious_stub() {
    naked_asm!("iretq")
}
