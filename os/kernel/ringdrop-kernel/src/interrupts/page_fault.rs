//! Page-fault gate: demand mapping for the reserved user page, fatal
//! report for everything else.
//!
//! The user window deliberately leaves its last leaf slot unmapped. The
//! first touch of that page arrives here; the handler maps the spare frame
//! the loader set aside by rebuilding the user tree with the slot filled,
//! reloads CR3 and returns to retry the faulting instruction. Every other
//! page fault is a bug in this little world and gets logged and halted.

use crate::context;
use crate::interrupts::{GateType, Idt};
use crate::mem::IdentityMapper;
use bitfield_struct::bitfield;
use core::arch::naked_asm;
use core::sync::atomic::Ordering;
use log::{error, info};
use ringdrop_abi::window::DEMAND_PAGE;
use ringdrop_registers::cr2::Cr2;
use ringdrop_registers::cr3::Cr3;
use ringdrop_registers::irq;
use ringdrop_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use ringdrop_vmem::build_user_tables;

pub const PAGE_FAULT_VECTOR: usize = 0x0E;

pub trait PageFaultInterrupt {
    /// Install the page-fault handler. Ring 0 only; the CPU delivers #PF
    /// regardless of the gate DPL.
    fn init_page_fault_gate(&mut self, handler: extern "C" fn()) -> &mut Self;
}

impl PageFaultInterrupt for Idt {
    fn init_page_fault_gate(&mut self, handler: extern "C" fn()) -> &mut Self {
        self[PAGE_FAULT_VECTOR]
            .set_handler(handler)
            .present(true)
            .gate_type(GateType::InterruptGate);
        self
    }
}

/// Entry stub for #PF. Saves the integer registers, hands the pushed error
/// code to the Rust handler and resumes the interrupted context when the
/// handler returns.
///
/// Frame math: the CPU 16-aligns RSP, then pushes SS, RSP, RFLAGS, CS, RIP
/// and the error code, leaving RSP 16-aligned again. Fifteen register
/// pushes put the error code at `[rsp + 120]` and leave RSP at 8 mod 16,
/// so one extra qword around the call restores ABI alignment. The trailing
/// `add rsp, 8` drops the error code, which `iretq` does not consume.
#[unsafe(naked)]
pub extern "C" fn page_fault_stub() {
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
        "mov rdi, [rsp + 120]",
        "sub rsp, 8",
        "call {handler}",
        "add rsp, 8",
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
        "add rsp, 8",
        "iretq",
        handler = sym page_fault_rust,
    )
}

/// Decide whether the fault is the expected demand touch.
///
/// Returning resumes the faulting instruction, so this only returns once
/// the mapping exists. CR2 is read before anything that could fault and
/// overwrite it.
extern "sysv64" fn page_fault_rust(error: PageFaultError) {
    let cr2 = unsafe { Cr2::load_unsafe() }.address();

    let ctx = context::get();
    if cr2.page_base().as_u64() == DEMAND_PAGE && !ctx.demand_mapped.swap(true, Ordering::AcqRel) {
        // First touch of the reserved page: rebuild the user tree with the
        // spare frame in the last slot and republish it through CR3, which
        // also flushes the stale non-present entry from the TLB.
        let root = match build_user_tables(
            &IdentityMapper,
            &ctx.user_arena,
            &ctx.kernel_tables,
            &ctx.user_image,
            true,
        ) {
            Ok(root) => root,
            Err(e) => {
                // Handoff validation capped the leaf count below the window,
                // so this cannot fire unless the context was corrupted.
                error!("demand rebuild failed: {e}");
                irq::halt_forever();
            }
        };
        debug_assert_eq!(root, ctx.user_pml4);
        unsafe {
            Cr3::from_pml4_phys(root).store_unsafe();
        }
        info!(
            "demand-mapped {DEMAND_PAGE:#x} -> {frame:#x}",
            frame = ctx.user_image.demand_frame.as_u64()
        );
        return;
    }

    error!(
        "page fault: cr2={cr2:#x} err={raw:#x} ({explain})",
        cr2 = cr2.as_u64(),
        raw = error.into_bits(),
        explain = error.explain()
    );
    irq::halt_forever();
}

/// Page-fault error code, Intel SDM Vol. 3A "Page-Fault Exception (#PF)".
#[bitfield(u64)]
pub struct PageFaultError {
    /// Clear for a non-present page, set for a protection violation.
    pub present: bool,
    /// Set when the access was a write.
    pub write: bool,
    /// Set when the access came from CPL 3.
    pub user: bool,
    /// Set when a reserved bit was set in a paging structure.
    pub reserved_bit: bool,
    /// Set for an instruction fetch.
    pub instruction_fetch: bool,
    /// Set for a protection-key violation.
    pub protection_key: bool,
    /// Set for a shadow-stack access.
    pub shadow_stack: bool,
    #[bits(57)]
    __: u64,
}

impl PageFaultError {
    #[must_use]
    pub fn explain(&self) -> &'static str {
        if !self.present() {
            "non-present page"
        } else if self.instruction_fetch() {
            if self.user() {
                "user instruction fetch from protected page"
            } else {
                "kernel instruction fetch from protected page"
            }
        } else if self.write() {
            "write to protected page"
        } else {
            "read from protected page"
        }
    }
}
