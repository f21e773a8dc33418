//! Periodic timer gate fed by the local APIC.
//!
//! The handler only acknowledges the interrupt and counts it; its real job
//! is proving that ring 3 gets interrupted and resumed transparently while
//! the user program runs.

use crate::apic;
use crate::interrupts::{GateType, Idt};
use crate::tls::TlsBlock;
use core::arch::naked_asm;
use core::sync::atomic::Ordering;

/// First vector past the architecture-reserved range.
pub const TIMER_VECTOR: u8 = 0x20;

pub trait TimerInterrupt {
    fn init_timer_gate(&mut self, handler: extern "C" fn()) -> &mut Self;
}

impl TimerInterrupt for Idt {
    fn init_timer_gate(&mut self, handler: extern "C" fn()) -> &mut Self {
        self[usize::from(TIMER_VECTOR)]
            .set_handler(handler)
            .present(true)
            .gate_type(GateType::InterruptGate);
        self
    }
}

/// Entry stub for the timer vector. Saves the full integer register file,
/// calls the Rust handler and resumes whatever was interrupted, in either
/// ring.
///
/// Frame math: the CPU 16-aligns RSP and pushes the five-qword interrupt
/// frame, leaving RSP at 8 mod 16. Fifteen register pushes bring it back
/// to 0 mod 16, exactly what the ABI wants in front of a `call`.
#[unsafe(naked)]
pub extern "C" fn timer_stub() {
    naked_asm!(
        "cld",
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "call {handler}",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        handler = sym timer_rust,
    )
}

extern "sysv64" fn timer_rust() {
    // EOI first; the gate keeps IF clear until iretq, so no nesting either way.
    unsafe {
        apic::end_of_interrupt();
    }
    TlsBlock::current().ticks.fetch_add(1, Ordering::Relaxed);
}
