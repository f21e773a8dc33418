//! Diagnostic gates for the architecture-defined exception vectors.
//!
//! Vectors 0 through 31 that have no dedicated handler get a stub that
//! reports the vector and halts. Without these, an unexpected exception
//! escalates through a non-present gate into a double and then triple
//! fault, resetting the machine before anything reaches the log.
//!
//! The stubs never return, so they skip the usual frame save: realign the
//! stack, pass the vector number and call into the reporter. Whether the
//! CPU pushed an error code for the vector does not matter for a one-way
//! trip.

use crate::interrupts::{GateType, Idt};
use core::arch::naked_asm;
use log::error;
use ringdrop_registers::irq;

/// How many vectors the architecture reserves for exceptions.
pub const EXCEPTION_VECTORS: usize = 32;

macro_rules! diagnostic_stub {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            naked_asm!(
                "and rsp, -16",
                "mov edi, {vector}",
                "call {report}",
                vector = const $vector,
                report = sym unhandled_vector,
            )
        }
    };
}

diagnostic_stub!(vector_00, 0);
diagnostic_stub!(vector_01, 1);
diagnostic_stub!(vector_02, 2);
diagnostic_stub!(vector_03, 3);
diagnostic_stub!(vector_04, 4);
diagnostic_stub!(vector_05, 5);
diagnostic_stub!(vector_06, 6);
diagnostic_stub!(vector_07, 7);
diagnostic_stub!(vector_08, 8);
diagnostic_stub!(vector_09, 9);
diagnostic_stub!(vector_10, 10);
diagnostic_stub!(vector_11, 11);
diagnostic_stub!(vector_12, 12);
diagnostic_stub!(vector_13, 13);
diagnostic_stub!(vector_14, 14);
diagnostic_stub!(vector_15, 15);
diagnostic_stub!(vector_16, 16);
diagnostic_stub!(vector_17, 17);
diagnostic_stub!(vector_18, 18);
diagnostic_stub!(vector_19, 19);
diagnostic_stub!(vector_20, 20);
diagnostic_stub!(vector_21, 21);
diagnostic_stub!(vector_22, 22);
diagnostic_stub!(vector_23, 23);
diagnostic_stub!(vector_24, 24);
diagnostic_stub!(vector_25, 25);
diagnostic_stub!(vector_26, 26);
diagnostic_stub!(vector_27, 27);
diagnostic_stub!(vector_28, 28);
diagnostic_stub!(vector_29, 29);
diagnostic_stub!(vector_30, 30);
diagnostic_stub!(vector_31, 31);

static DIAGNOSTIC_STUBS: [extern "C" fn(); EXCEPTION_VECTORS] = [
    vector_00, vector_01, vector_02, vector_03, vector_04, vector_05, vector_06, vector_07,
    vector_08, vector_09, vector_10, vector_11, vector_12, vector_13, vector_14, vector_15,
    vector_16, vector_17, vector_18, vector_19, vector_20, vector_21, vector_22, vector_23,
    vector_24, vector_25, vector_26, vector_27, vector_28, vector_29, vector_30, vector_31,
];

/// Intel SDM volume 3 mnemonics, indexed by vector.
static EXCEPTION_NAMES: [&str; EXCEPTION_VECTORS] = [
    "#DE divide error",
    "#DB debug",
    "NMI",
    "#BP breakpoint",
    "#OF overflow",
    "#BR bound range exceeded",
    "#UD invalid opcode",
    "#NM device not available",
    "#DF double fault",
    "coprocessor segment overrun",
    "#TS invalid TSS",
    "#NP segment not present",
    "#SS stack-segment fault",
    "#GP general protection",
    "#PF page fault",
    "reserved (15)",
    "#MF x87 floating-point",
    "#AC alignment check",
    "#MC machine check",
    "#XM SIMD floating-point",
    "#VE virtualization",
    "#CP control protection",
    "reserved (22)",
    "reserved (23)",
    "reserved (24)",
    "reserved (25)",
    "reserved (26)",
    "reserved (27)",
    "#HV hypervisor injection",
    "#VC VMM communication",
    "#SX security",
    "reserved (31)",
];

pub trait DiagnosticGates {
    /// Route every exception vector to a report-and-halt stub.
    ///
    /// Install these first; dedicated handlers such as the page-fault gate
    /// overwrite their vector afterwards.
    fn init_diagnostic_gates(&mut self) -> &mut Self;
}

impl DiagnosticGates for Idt {
    fn init_diagnostic_gates(&mut self) -> &mut Self {
        for (vector, stub) in DIAGNOSTIC_STUBS.iter().enumerate() {
            self[vector]
                .set_handler(*stub)
                .present(true)
                .gate_type(GateType::InterruptGate);
        }
        self
    }
}

/// Report an exception no handler claims, then stop.
///
/// Called from the stubs with interrupts masked by the gate.
extern "sysv64" fn unhandled_vector(vector: u32) -> ! {
    let name = EXCEPTION_NAMES
        .get(vector as usize)
        .copied()
        .unwrap_or("out of range");
    error!("unhandled exception: vector {vector} ({name})");
    irq::halt_forever();
}
