//! Global Descriptor Table and TSS wiring for long mode.
//!
//! Long mode retired most of segmentation, but selectors still carry the
//! three things the privilege drop depends on:
//!
//! - the **code vs data** distinction for CS and SS,
//! - the **DPL** the CPU checks on every ring transition,
//! - the location of the **TSS**, whose `rsp0` becomes the stack on any
//!   ring-3 to ring-0 entry.
//!
//! ## Layout
//!
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | Kernel code, DPL=0 ([`KERNEL_CS_SEL`])
//! 2     | 0x10     | Kernel data, DPL=0 ([`KERNEL_DS_SEL`])
//! 3     | 0x18     | User data, DPL=3; with RPL=3 loads as **0x1b** ([`USER_DS_SEL`])
//! 4     | 0x20     | User code, DPL=3; with RPL=3 loads as **0x23** ([`USER_CS_SEL`])
//! 5/6   | 0x28     | TSS, 16-byte system descriptor ([`TSS_SYS_SEL`])
//!
//! The relative order is load-bearing twice over: `SYSCALL` derives SS as
//! kernel CS + 8, and `SYSRET` derives user CS as `IA32_STAR[63:48]` + 16
//! and user SS as + 8. Data-before-code in the user pair is exactly what
//! `SYSRET` assumes.

pub mod descriptors;
pub mod selectors;
pub mod tss_desc;

use crate::gdt::descriptors::Desc64;
use crate::gdt::selectors::{CodeSel, DataSel, SegmentSelector, TssSel};
use crate::gdt::tss_desc::TssDesc64;
use crate::privilege::{Dpl, KERNEL_RPL, USER_RPL};
use crate::tss::Tss64;
use ringdrop_registers::dtr::DescriptorTablePointer;
use ringdrop_registers::{segments, tr};
use ringdrop_vmem::VirtualAddress;

pub const KERNEL_CS_SEL: SegmentSelector<CodeSel> = SegmentSelector::<CodeSel>::new(1, KERNEL_RPL);
pub const KERNEL_DS_SEL: SegmentSelector<DataSel> = SegmentSelector::<DataSel>::new(2, KERNEL_RPL);
pub const USER_DS_SEL: SegmentSelector<DataSel> = SegmentSelector::<DataSel>::new(3, USER_RPL);
pub const USER_CS_SEL: SegmentSelector<CodeSel> = SegmentSelector::<CodeSel>::new(4, USER_RPL);
pub const TSS_SYS_SEL: SegmentSelector<TssSel> = SegmentSelector::<TssSel>::new(5);

// Encoded selector numbers, for MSRs, stack frames and inline asm.
pub const KERNEL_CS: u16 = KERNEL_CS_SEL.encode(); // 0x08
pub const KERNEL_DS: u16 = KERNEL_DS_SEL.encode(); // 0x10
pub const USER_DS: u16 = USER_DS_SEL.encode(); // 0x1b
pub const USER_CS: u16 = USER_CS_SEL.encode(); // 0x23
pub const TSS_SEL: u16 = TSS_SYS_SEL.encode(); // 0x28

// The raw numbers the rest of the system hardcodes into MSRs and frames,
// re-derived from the encoding formula `(index << 3) | (TI=0) | RPL`.
const _: () = {
    const fn enc(index: u16, rpl: u16) -> u16 {
        (index << 3) | rpl
    }

    assert!(KERNEL_CS == 0x08);
    assert!(KERNEL_DS == 0x10);
    assert!(USER_DS == 0x1b);
    assert!(USER_CS == 0x23);
    assert!(TSS_SEL == 0x28);

    assert!(KERNEL_CS == enc(1, 0));
    assert!(KERNEL_DS == enc(2, 0));
    assert!(USER_DS == enc(3, 3));
    assert!(USER_CS == enc(4, 3));
    assert!(TSS_SEL == enc(5, 0));

    // SYSCALL finds kernel SS at kernel CS + 8; SYSRET finds user CS at
    // the STAR user base + 16 and user SS at + 8.
    assert!(KERNEL_DS == KERNEL_CS + 8);
    assert!(USER_CS == USER_DS + 8);
};

/// The complete descriptor table for the bootstrap CPU.
///
/// Field order is the table in the module doc; the TSS descriptor spans
/// the final two slots.
#[repr(C, align(16))]
pub struct Gdt {
    /// Mandatory all-zero entry at index 0.
    null: Desc64,
    /// Kernel code, index 1. Kernel data must follow it for `SYSCALL`.
    kcode: Desc64,
    /// Kernel data/stack, index 2.
    kdata: Desc64,
    /// User data/stack, index 3. Must precede user code for `SYSRET`.
    udata: Desc64,
    /// User code, index 4.
    ucode: Desc64,
    /// Available 64-bit TSS descriptor, indexes 5 and 6.
    tss: TssDesc64,
}

impl Gdt {
    pub const fn new_with_tss(tss: TssDesc64) -> Self {
        Self {
            null: Desc64::null(),
            kcode: Desc64::from_code_dpl(Dpl::Ring0),
            kdata: Desc64::from_data_dpl(Dpl::Ring0),
            udata: Desc64::from_data_dpl(Dpl::Ring3),
            ucode: Desc64::from_code_dpl(Dpl::Ring3),
            tss,
        }
    }

    pub const fn new() -> Self {
        Self::new_with_tss(TssDesc64::new(VirtualAddress::new(0), 0))
    }
}

impl Default for Gdt {
    fn default() -> Self {
        Self::new()
    }
}

/// The bootstrap CPU's GDT. Written once during [`init_gdt_and_tss`],
/// then only read by the CPU.
static mut GDT: Gdt = Gdt::new();

/// Build and activate the GDT, pointing its system descriptor at `tss`.
///
/// Loads GDTR, refreshes DS/ES/SS with the kernel data selector, far-jumps
/// CS onto the kernel code selector and loads TR. Afterwards every ring
/// transition the bootstrap sets up (interrupts, `SYSCALL`, the `iretq`
/// drop) resolves against this table.
///
/// # Safety
/// CPL0, interrupts masked. `tss` must stay resident for the lifetime of
/// the CPU; the GDT itself lives in kernel static storage. Call once; a
/// second `ltr` against the now-busy descriptor raises #GP.
#[allow(clippy::cast_possible_truncation)]
pub unsafe fn init_gdt_and_tss(tss: &'static Tss64) {
    let tss_base = VirtualAddress::new(core::ptr::from_ref(tss) as u64);
    let tss_limit = (size_of::<Tss64>() - 1) as u32;

    #[allow(static_mut_refs)]
    unsafe {
        GDT = Gdt::new_with_tss(TssDesc64::new(tss_base, tss_limit));

        DescriptorTablePointer::for_table(&GDT).load_gdt();
        segments::load_data_segments(KERNEL_DS);
        segments::reload_code_segment(KERNEL_CS);
        tr::load_task_register(TSS_SEL);
    }
}
