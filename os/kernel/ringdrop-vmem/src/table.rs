//! # Typed page tables
//!
//! One module per paging level, each with a strongly-typed index (so an L1
//! index cannot be used on a PML4), a typed entry wrapper over the shared
//! [`PageEntryBits`](crate::entry::PageEntryBits) codec, and a 4 KiB-aligned
//! 512-entry table type.

pub mod pd;
pub mod pdpt;
pub mod pml4;
pub mod pt;

pub use pd::{L2Index, PageDirectory, PdEntry};
pub use pdpt::{L3Index, PageDirectoryPointerTable, PdptEntry};
pub use pml4::{L4Index, PageMapLevel4, Pml4Entry};
pub use pt::{L1Index, PageTable, PtEntry};

use crate::addr::VirtualAddress;

/// Entries per table at every level.
pub const ENTRIES_PER_TABLE: usize = 512;

/// Split a canonical virtual address into its four per-level indices.
#[inline]
#[must_use]
pub const fn split_indices(va: VirtualAddress) -> (L4Index, L3Index, L2Index, L1Index) {
    (
        L4Index::from(va),
        L3Index::from(va),
        L2Index::from(va),
        L1Index::from(va),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indices_ok() {
        // 0xFFFF_FFFF_C000_0000: PML4 511, PDPT 511, PD 0, PT 0.
        let va = VirtualAddress::new(0xFFFF_FFFF_C000_0000);
        let (l4, l3, l2, l1) = split_indices(va);
        assert_eq!(l4.as_usize(), 511);
        assert_eq!(l3.as_usize(), 511);
        assert_eq!(l2.as_usize(), 0);
        assert_eq!(l1.as_usize(), 0);

        // Offset by one page moves only the PT index.
        let va = VirtualAddress::new(0xFFFF_FFFF_C000_1000);
        let (l4, l3, l2, l1) = split_indices(va);
        assert_eq!(l4.as_usize(), 511);
        assert_eq!(l3.as_usize(), 511);
        assert_eq!(l2.as_usize(), 0);
        assert_eq!(l1.as_usize(), 1);

        // The last page of the window's 2 MiB slice sits at PT slot 511.
        let va = VirtualAddress::new(0xFFFF_FFFF_C01F_F000);
        let (l4, l3, l2, l1) = split_indices(va);
        assert_eq!(l4.as_usize(), 511);
        assert_eq!(l3.as_usize(), 511);
        assert_eq!(l2.as_usize(), 0);
        assert_eq!(l1.as_usize(), 511);
    }
}
