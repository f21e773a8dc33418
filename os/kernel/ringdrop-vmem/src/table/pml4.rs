//! # Page Map Level 4 (PML4 / L4)
//!
//! The root level; its physical base is what CR3 points at. Entries here
//! always reference a PDPT. The user tree's slot 0 is special: it carries a
//! verbatim copy of the kernel tree's slot 0, which is what keeps kernel
//! mappings visible after the CR3 switch.

use crate::addr::{PhysicalAddress, VirtualAddress};
use crate::entry::PageEntryBits;
use crate::table::ENTRIES_PER_TABLE;

/// Index into the PML4 (virtual-address bits `[47:39]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L4Index(u16);

impl L4Index {
    /// Extract the PML4 index from a virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 39) & 0x1FF) as u16)
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

/// One L4 entry: a pointer to a PDPT, or zero when unmapped.
#[doc(alias = "PML4E")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Pml4Entry(PageEntryBits);

impl Pml4Entry {
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

    /// The referenced PDPT base. Meaningful only when present.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> PhysicalAddress {
        self.0.physical_address()
    }

    /// A non-leaf entry pointing at the PDPT at `table` with `flags`.
    /// The table base must be 4 KiB aligned.
    #[inline]
    #[must_use]
    pub const fn make_next(table: PhysicalAddress, flags: PageEntryBits) -> Self {
        Self(flags.with_large_page(false).with_physical_address(table))
    }
}

impl Default for Pml4Entry {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

/// The PML4: 512 entries, 4 KiB-aligned. CR3 points at this table.
#[doc(alias = "PML4")]
#[repr(C, align(4096))]
pub struct PageMapLevel4 {
    entries: [Pml4Entry; ENTRIES_PER_TABLE],
}

const _: () = assert!(size_of::<PageMapLevel4>() == 4096);

impl PageMapLevel4 {
    /// A fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [Pml4Entry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: L4Index) -> Pml4Entry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`. TLB maintenance is the caller's concern.
    #[inline]
    pub const fn set(&mut self, i: L4Index, e: Pml4Entry) {
        self.entries[i.as_usize()] = e;
    }

    /// Derive the PML4 index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> L4Index {
        L4Index::from(va)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pml4e_round_trips_verbatim() {
        // A cross-link copy must preserve every bit, including OS-available
        // and reserved ranges.
        let raw = 0x8000_0123_4567_8963;
        let e = Pml4Entry::from_bits(raw);
        assert_eq!(e.into_bits(), raw);
    }
}
