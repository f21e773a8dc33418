//! # Page Directory (PD / L2)
//!
//! Second-lowest level. Every populated entry here points at a Page Table;
//! 2 MiB leaves (`PS=1`) are never built by this crate.

use crate::addr::{PhysicalAddress, VirtualAddress};
use crate::entry::PageEntryBits;
use crate::table::ENTRIES_PER_TABLE;

/// Index into a Page Directory (virtual-address bits `[29:21]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L2Index(u16);

impl L2Index {
    /// Extract the PD index from a virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 21) & 0x1FF) as u16)
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

/// One L2 entry: a pointer to a Page Table, or zero when unmapped.
#[doc(alias = "PDE")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PdEntry(PageEntryBits);

impl PdEntry {
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

    /// The referenced Page Table base. Meaningful only when present.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> PhysicalAddress {
        self.0.physical_address()
    }

    /// A non-leaf entry pointing at the Page Table at `table` with `flags`.
    /// Forces `PS=0`; the table base must be 4 KiB aligned.
    #[inline]
    #[must_use]
    pub const fn make_next(table: PhysicalAddress, flags: PageEntryBits) -> Self {
        Self(flags.with_large_page(false).with_physical_address(table))
    }
}

impl Default for PdEntry {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

/// The Page Directory: 512 entries, 4 KiB-aligned.
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; ENTRIES_PER_TABLE],
}

const _: () = assert!(size_of::<PageDirectory>() == 4096);

impl PageDirectory {
    /// A fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: L2Index) -> PdEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`. TLB maintenance is the caller's concern.
    #[inline]
    pub const fn set(&mut self, i: L2Index, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Derive the PD index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> L2Index {
        L2Index::from(va)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pde_points_at_table() {
        let pt = PhysicalAddress::new(0x3000_0000);
        let e = PdEntry::make_next(pt, PageEntryBits::new_common_rw());
        assert!(e.is_present());
        assert_eq!(e.next_table(), pt);
        assert_eq!(e.into_bits() & (1 << 7), 0, "PS must stay clear");
        assert_eq!(PdEntry::from_bits(e.into_bits()), e);
    }
}
