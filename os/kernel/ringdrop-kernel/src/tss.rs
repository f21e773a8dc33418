//! Minimal 64-bit Task State Segment.
//!
//! Long mode does not hardware-task-switch, but the CPU still consults the
//! TSS on privilege transitions: when an interrupt or exception arrives at
//! CPL 3, it loads the kernel stack pointer from `rsp0` before pushing the
//! interrupt frame. `syscall` does not consult the TSS at all; the syscall
//! path gets its stack from the thread-local block instead.
//!
//! The structure itself lives in a dedicated page handed over by the loader;
//! this module only defines the layout and fills it in. The GDT holds the
//! 16-byte system descriptor pointing at it.

use core::mem::size_of;
use ringdrop_vmem::VirtualAddress;

/// 64-bit TSS as laid out by the architecture.
///
/// Reserved fields must stay zero. `ist1..ist7` are optional per-gate stacks
/// selected by the IST index in an IDT entry; none of our gates use them, so
/// they remain zero. `iopb_offset` at or past the segment limit means no I/O
/// permission bitmap is present, which leaves port I/O to the IOPL check and
/// thus denies it to ring 3.
#[repr(C, packed)]
pub struct Tss64 {
    _reserved0: u32,
    /// Ring-0 stack pointer loaded on a CPL 3 to CPL 0 interrupt transition.
    pub rsp0: VirtualAddress,
    /// Ring-1 stack pointer. Unused, no CPL 1 segments exist.
    pub rsp1: VirtualAddress,
    /// Ring-2 stack pointer. Unused, no CPL 2 segments exist.
    pub rsp2: VirtualAddress,
    _reserved1: u64,
    /// Interrupt Stack Table slots 1..7, selected per IDT gate. All unused.
    pub ist1: VirtualAddress,
    pub ist2: VirtualAddress,
    pub ist3: VirtualAddress,
    pub ist4: VirtualAddress,
    pub ist5: VirtualAddress,
    pub ist6: VirtualAddress,
    pub ist7: VirtualAddress,
    _reserved2: u64,
    _reserved3: u16,
    /// Offset from the TSS base to the I/O permission bitmap. Set to the
    /// size of the structure so no bitmap is present.
    pub iopb_offset: u16,
}

const _: () = {
    // Architectural size of the 64-bit TSS.
    assert!(size_of::<Tss64>() == 104);
};

impl Tss64 {
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new() -> Self {
        Self {
            _reserved0: 0,
            rsp0: VirtualAddress::new(0),
            rsp1: VirtualAddress::new(0),
            rsp2: VirtualAddress::new(0),
            _reserved1: 0,
            ist1: VirtualAddress::new(0),
            ist2: VirtualAddress::new(0),
            ist3: VirtualAddress::new(0),
            ist4: VirtualAddress::new(0),
            ist5: VirtualAddress::new(0),
            ist6: VirtualAddress::new(0),
            ist7: VirtualAddress::new(0),
            _reserved2: 0,
            _reserved3: 0,
            iopb_offset: size_of::<Self>() as u16,
        }
    }
}

impl Default for Tss64 {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill a TSS in place with a ring-0 interrupt stack.
///
/// Overwrites the whole structure; the backing page arrives from the loader
/// without any zeroing guarantee, and the reserved fields must read zero.
pub const fn init_tss(tss: &mut Tss64, interrupt_stack_top: VirtualAddress) {
    *tss = Tss64::new();
    tss.rsp0 = interrupt_stack_top;
}
