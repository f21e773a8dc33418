use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use ringdrop_vmem::PhysicalAddress;

/// CR3 — Page-Map Level-4 Base Register (IA-32e, PCID disabled).
///
/// Holds the physical base of the active PML4 plus cache-control bits for
/// walks of that table. Storing CR3 also flushes all non-global TLB
/// entries, which is how the demand-fault path publishes a rebuilt tree.
#[bitfield(u64)]
pub struct Cr3 {
    /// Bits 0–2 — Reserved (must be 0).
    #[bits(3)]
    reserved0: u8,

    /// Bit 3 — PWT: write-through caching for PML4 accesses.
    pub pwt: bool,

    /// Bit 4 — PCD: cache disable for PML4 accesses.
    pub pcd: bool,

    /// Bits 5–11 — Reserved (must be 0 when written).
    #[bits(7)]
    reserved1: u8,

    /// Bits 12–51 — PML4 physical base >> 12.
    #[bits(40)]
    pml4_base_4k: u64,

    /// Bits 52–63 — Reserved.
    #[bits(12)]
    reserved2: u16,
}

impl Cr3 {
    /// A `Cr3` value selecting the PML4 at `pml4_phys`, write-back cached.
    ///
    /// The base must be 4 KiB aligned (debug-checked).
    #[must_use]
    pub fn from_pml4_phys(pml4_phys: PhysicalAddress) -> Self {
        debug_assert!(pml4_phys.is_page_aligned(), "PML4 base must be 4K-aligned");
        Self::new().with_pml4_base_4k(pml4_phys.as_u64() >> 12)
    }

    /// The full physical address of the PML4 base.
    #[must_use]
    pub fn pml4_phys(self) -> PhysicalAddress {
        PhysicalAddress::new(self.pml4_base_4k() << 12)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn base_round_trips_and_flags_stay_clear() {
        let base = PhysicalAddress::new(0x0000_0000_7FFF_E000);
        let cr3 = Cr3::from_pml4_phys(base);
        assert_eq!(cr3.pml4_phys(), base);
        assert_eq!(cr3.into_bits(), base.as_u64());
        assert!(!cr3.pwt());
        assert!(!cr3.pcd());
    }
}
