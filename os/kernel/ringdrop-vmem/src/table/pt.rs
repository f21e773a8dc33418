//! # Page Table (PT / L1)
//!
//! The final paging level. Every populated entry here is a 4 KiB leaf:
//! the address field holds the frame base of the mapped page.

use crate::addr::{PhysicalAddress, VirtualAddress};
use crate::entry::PageEntryBits;
use crate::table::ENTRIES_PER_TABLE;

/// Index into a Page Table (virtual-address bits `[20:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L1Index(u16);

impl L1Index {
    /// Extract the PT index from a virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 12) & 0x1FF) as u16)
    }

    /// Construct from a raw value; must be below 512 (debug-checked).
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 512);
        Self(v)
    }

    /// The index as `usize` for table access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// One L1 entry: a 4 KiB leaf mapping, or zero when unmapped.
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PtEntry(PageEntryBits);

impl PtEntry {
    /// A non-present (all-zero) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    /// Decode from a raw 64-bit word.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(PageEntryBits::from_bits(bits))
    }

    /// Encode back into the raw 64-bit word.
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u64 {
        self.0.into_bits()
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// The decoded flag view of the entry.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    /// The mapped frame base. Meaningful only when present.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalAddress {
        self.0.physical_address()
    }

    /// A leaf entry mapping `frame` with `flags`. The frame base must be
    /// 4 KiB aligned (debug-checked by the codec).
    #[inline]
    #[must_use]
    pub const fn make_4k(frame: PhysicalAddress, flags: PageEntryBits) -> Self {
        Self(flags.with_physical_address(frame))
    }
}

impl Default for PtEntry {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

/// The Page Table: 512 leaf entries, 4 KiB-aligned.
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; ENTRIES_PER_TABLE],
}

const _: () = assert!(size_of::<PageTable>() == 4096);

impl PageTable {
    /// A fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PtEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: L1Index) -> PtEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`. TLB maintenance is the caller's concern.
    #[inline]
    pub const fn set(&mut self, i: L1Index, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Derive the PT index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> L1Index {
        L1Index::from(va)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pte_4k_leaf() {
        let frame = PhysicalAddress::new(0x0000_0000_0012_3000);
        let e = PtEntry::make_4k(frame, PageEntryBits::new_user_rw());
        assert!(e.is_present());
        assert_eq!(e.frame(), frame);
        assert!(e.flags().user_access());
        assert_eq!(PtEntry::from_bits(e.into_bits()), e);
    }

    #[test]
    fn zero_entry_is_all_zero() {
        assert_eq!(PtEntry::zero().into_bits(), 0);
        assert!(!PtEntry::zero().is_present());
    }
}
