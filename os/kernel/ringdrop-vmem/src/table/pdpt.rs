//! # Page Directory Pointer Table (PDPT / L3)
//!
//! Third level. Every populated entry here points at a Page Directory;
//! 1 GiB leaves (`PS=1`) are never built by this crate.

use crate::addr::{PhysicalAddress, VirtualAddress};
use crate::entry::PageEntryBits;
use crate::table::ENTRIES_PER_TABLE;

/// Index into a PDPT (virtual-address bits `[38:30]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L3Index(u16);

impl L3Index {
    /// Extract the PDPT index from a virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 30) & 0x1FF) as u16)
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

/// One L3 entry: a pointer to a Page Directory, or zero when unmapped.
#[doc(alias = "PDPE")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PdptEntry(PageEntryBits);

impl PdptEntry {
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

    /// The referenced Page Directory base. Meaningful only when present.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> PhysicalAddress {
        self.0.physical_address()
    }

    /// A non-leaf entry pointing at the Page Directory at `table` with
    /// `flags`. Forces `PS=0`; the table base must be 4 KiB aligned.
    #[inline]
    #[must_use]
    pub const fn make_next(table: PhysicalAddress, flags: PageEntryBits) -> Self {
        Self(flags.with_large_page(false).with_physical_address(table))
    }
}

impl Default for PdptEntry {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

/// The Page Directory Pointer Table: 512 entries, 4 KiB-aligned.
#[doc(alias = "PDPT")]
#[repr(C, align(4096))]
pub struct PageDirectoryPointerTable {
    entries: [PdptEntry; ENTRIES_PER_TABLE],
}

const _: () = assert!(size_of::<PageDirectoryPointerTable>() == 4096);

impl PageDirectoryPointerTable {
    /// A fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdptEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: L3Index) -> PdptEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`. TLB maintenance is the caller's concern.
    #[inline]
    pub const fn set(&mut self, i: L3Index, e: PdptEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Derive the PDPT index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> L3Index {
        L3Index::from(va)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pdpe_points_at_directory() {
        let pd = PhysicalAddress::new(0x0000_0000_0040_0000);
        let e = PdptEntry::make_next(pd, PageEntryBits::new_user_rw());
        assert!(e.is_present());
        assert_eq!(e.next_table(), pd);
        assert!(e.flags().user_access());
        assert_eq!(PdptEntry::from_bits(e.into_bits()), e);
    }
}
