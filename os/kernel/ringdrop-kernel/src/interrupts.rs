//! Interrupt Descriptor Table with a fluent gate builder.
//!
//! The IDT is an array of 256 gate descriptors of 16 bytes each; the CPU
//! consults it for every exception and interrupt once `lidt` has run.
//! Entries are declared like this:
//!
//! ```ignore
//! idt[PAGE_FAULT_VECTOR]
//!     .set_handler(page_fault_stub)
//!     .present(true)
//!     .gate_type(GateType::InterruptGate);
//! ```
//!
//! Gates default to the kernel code segment, DPL 0, no IST and not present,
//! so a forgotten builder call fails closed. Interrupt gates clear IF on
//! entry, trap gates leave it unchanged; everything here uses interrupt
//! gates so handlers never nest.
//!
//! Privilege transitions through these gates load the ring-0 stack from the
//! TSS, so [`crate::gdt::init_gdt_and_tss`] must have run before any gate
//! can fire from ring 3.

pub mod default;
pub mod page_fault;
pub mod spurious;
pub mod timer;

use crate::gdt;
use bitfield_struct::bitfield;
use core::mem::size_of;
use core::ops::{Index, IndexMut};
use ringdrop_registers::dtr::DescriptorTablePointer;

// Architectural layout requirements.
const _: () = assert!(size_of::<IdtEntry>() == 16);
const _: () = assert!(size_of::<Idt>() == 256 * 16);
const _: () = assert!(align_of::<Idt>() == 16);

/// The packed middle two bytes of a gate descriptor: IST index in the low
/// byte, then type, system bit, DPL and present in the high byte.
#[bitfield(u16)]
pub struct IdtGateAttr {
    /// Interrupt Stack Table index; 0 keeps the normal stack switch.
    #[bits(3)]
    pub ist: u8,
    /// Hardware-reserved, must be zero.
    #[bits(5)]
    __zero0: u8,
    /// Gate type: 0xE interrupt gate, 0xF trap gate.
    #[bits(4)]
    pub typ: u8,
    /// System bit, zero for interrupt and trap gates.
    #[bits(1)]
    pub s: bool,
    /// Privilege required to reach the gate via a software `int`.
    #[bits(2)]
    pub dpl: u8,
    /// Present bit; the CPU raises #NP for vectors whose gate clears it.
    #[bits(1)]
    pub present: bool,
}

impl IdtGateAttr {
    /// An interrupt gate (type 0xE): IF is cleared on entry.
    #[inline]
    #[must_use]
    pub const fn interrupt_gate() -> Self {
        Self::new().with_typ(0xE).with_s(false)
    }

    /// A trap gate (type 0xF): IF is left unchanged.
    #[inline]
    #[must_use]
    pub const fn trap_gate() -> Self {
        Self::new().with_typ(0xF).with_s(false)
    }
}

/// A 256-entry Interrupt Descriptor Table.
///
/// Build one with [`Idt::new`], fill gates by indexing, then hand it to
/// [`crate::idt::init_idt_once`] which moves it into static storage and
/// executes `lidt`.
#[repr(C, align(16))]
pub struct Idt {
    entries: [IdtEntry; 256],
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

impl Idt {
    /// An empty table with every gate marked not present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; 256],
        }
    }

    /// Load this table into IDTR and enable interrupts, as one step.
    ///
    /// Pairing the `lidt` with the `sti` means there is never a window in
    /// which interrupts are enabled against a partially sourced table.
    ///
    /// # Safety
    /// CPL0 only. Every present gate must point at a valid handler, every
    /// interrupt source that can fire must have its vector populated, and
    /// the table must stay at this address for as long as it is active,
    /// hence the `'static` receiver.
    pub unsafe fn load_and_enable(&'static self) {
        unsafe {
            DescriptorTablePointer::for_table(self).load_idt_enable_interrupts();
        }
    }
}

impl Index<usize> for Idt {
    type Output = IdtEntry;

    fn index(&self, i: usize) -> &Self::Output {
        &self.entries[i]
    }
}

impl IndexMut<usize> for Idt {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.entries[i]
    }
}

/// One 16-byte gate descriptor.
///
/// The handler offset is scattered across three fields; `selector` names
/// the code segment the handler runs in; `ist_type` carries the packed
/// attribute bytes, see [`IdtGateAttr`]. The trailing dword is reserved.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    // Manipulated through IdtGateAttr.
    ist_type: u16,
    offset_mid: u16,
    offset_hi: u32,
    zero: u32,
}

/// Gate kinds supported by the builder.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GateType {
    /// Masks further maskable interrupts on entry (clears IF).
    InterruptGate,
    /// Leaves IF unchanged.
    TrapGate,
}

impl IdtEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        ist_type: IdtGateAttr::new().into_bits(),
        offset_mid: 0,
        offset_hi: 0,
        zero: 0,
    };

    /// Point this gate at `handler` and return a builder for the rest.
    ///
    /// The selector defaults to [`gdt::KERNEL_CS`] and the attributes to a
    /// non-present ring-0 interrupt gate without IST; chain builder calls
    /// to adjust, and finish with `.present(true)`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_handler(&mut self, handler: extern "C" fn()) -> IdtEntryBuilder<'_> {
        let addr = handler as u64;
        self.offset_lo = (addr & 0xFFFF) as u16;
        self.offset_mid = ((addr >> 16) & 0xFFFF) as u16;
        self.offset_hi = (addr >> 32) as u32;
        self.selector = gdt::KERNEL_CS;
        self.ist_type = IdtGateAttr::interrupt_gate()
            .with_present(false)
            .with_dpl(0)
            .with_ist(0)
            .into_bits();

        IdtEntryBuilder { entry: self }
    }
}

/// Fluent builder over a single [`IdtEntry`].
pub struct IdtEntryBuilder<'a> {
    entry: &'a mut IdtEntry,
}

impl IdtEntryBuilder<'_> {
    /// Set the present bit. The gate stays dead until this is `true`.
    #[inline]
    pub const fn present(self, p: bool) -> Self {
        let bf = IdtGateAttr::from_bits(self.entry.ist_type).with_present(p);
        self.entry.ist_type = bf.into_bits();
        self
    }

    /// Privilege level required to invoke the gate with a software `int`.
    /// Hardware-delivered exceptions and interrupts ignore it.
    #[inline]
    pub fn dpl(self, dpl: u8) -> Self {
        debug_assert!(dpl <= 3);
        let bf = IdtGateAttr::from_bits(self.entry.ist_type).with_dpl(dpl);
        self.entry.ist_type = bf.into_bits();
        self
    }

    /// Make this an interrupt gate (type 0xE).
    #[inline]
    pub const fn gate_interrupt(self) -> Self {
        let bf = IdtGateAttr::from_bits(self.entry.ist_type)
            .with_typ(0xE)
            .with_s(false);
        self.entry.ist_type = bf.into_bits();
        self
    }

    /// Make this a trap gate (type 0xF).
    #[inline]
    pub const fn gate_trap(self) -> Self {
        let bf = IdtGateAttr::from_bits(self.entry.ist_type)
            .with_typ(0xF)
            .with_s(false);
        self.entry.ist_type = bf.into_bits();
        self
    }

    /// Choose the gate type via [`GateType`].
    #[inline]
    pub const fn gate_type(self, gate_type: GateType) -> Self {
        match gate_type {
            GateType::InterruptGate => self.gate_interrupt(),
            GateType::TrapGate => self.gate_trap(),
        }
    }

    /// Select an Interrupt Stack Table slot (1..=7); 0 disables IST.
    #[inline]
    pub fn ist(self, idx: u8) -> Self {
        debug_assert!(idx <= 7);
        let bf = IdtGateAttr::from_bits(self.entry.ist_type).with_ist(idx);
        self.entry.ist_type = bf.into_bits();
        self
    }

    /// Override the code segment selector.
    #[inline]
    pub const fn selector(self, sel: u16) -> Self {
        self.entry.selector = sel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn nop_handler() {}

    #[test]
    fn missing_entry_is_all_zero_attributes() {
        let attr = IdtGateAttr::from_bits(IdtEntry::MISSING.ist_type);
        assert!(!attr.present());
        assert_eq!(attr.typ(), 0);
        assert_eq!(attr.ist(), 0);
    }

    #[test]
    fn interrupt_gate_attr_encodes_0x8e() {
        let attr = IdtGateAttr::interrupt_gate().with_present(true);
        assert_eq!(attr.into_bits() >> 8, 0x8E);
        assert_eq!(attr.into_bits() & 0xFF, 0);
    }

    #[test]
    fn trap_gate_attr_encodes_0x8f() {
        let attr = IdtGateAttr::trap_gate().with_present(true);
        assert_eq!(attr.into_bits() >> 8, 0x8F);
    }

    #[test]
    fn builder_scatters_handler_offset() {
        let mut idt = Idt::new();
        idt[0x21]
            .set_handler(nop_handler)
            .present(true)
            .gate_type(GateType::InterruptGate);

        let addr = nop_handler as u64;
        let e = &idt[0x21];
        assert_eq!(u64::from(e.offset_lo), addr & 0xFFFF);
        assert_eq!(u64::from(e.offset_mid), (addr >> 16) & 0xFFFF);
        assert_eq!(u64::from(e.offset_hi), addr >> 32);
        assert_eq!(e.selector, gdt::KERNEL_CS);
        assert_eq!(e.zero, 0);
    }

    #[test]
    fn dpl3_gate_carries_user_privilege() {
        let mut idt = Idt::new();
        idt[0x80]
            .set_handler(nop_handler)
            .dpl(3)
            .present(true)
            .gate_interrupt();

        let attr = IdtGateAttr::from_bits(idt[0x80].ist_type);
        assert_eq!(attr.dpl(), 3);
        assert!(attr.present());
        assert_eq!(attr.typ(), 0xE);
    }
}
