//! # Page-table entry codec
//!
//! [`PageEntryBits`] is the one bit-accurate overlay for the 64-bit entry
//! word. All four table levels (PML4E/PDPE/PDE/PTE) share this layout; the
//! levels differ only in how the physical-address field is interpreted
//! (next-level table base vs. leaf frame base), which the typed wrappers in
//! [`crate::table`] express.
//!
//! Encoding and decoding are total: [`PageEntryBits::from_bits`] followed by
//! [`PageEntryBits::into_bits`] reproduces any raw value bit for bit,
//! including reserved and OS-available ranges. A non-present entry is
//! conventionally all-zero.

use crate::addr::PhysicalAddress;
use bitfield_struct::bitfield;

/// One 64-bit paging entry, any level.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (bit 0): the entry references a frame or a next-level table.
    pub present: bool,
    /// Writable (bit 1).
    pub writable: bool,
    /// User-accessible (bit 2): permits CPL 3 access through this entry.
    pub user_access: bool,
    /// Write-Through caching (bit 3).
    pub write_through: bool,
    /// Cache Disable (bit 4).
    pub cache_disabled: bool,
    /// Accessed (bit 5): set by the CPU on first use.
    pub accessed: bool,
    /// Dirty (bit 6): set by the CPU on first write (leaf entries only).
    pub dirty: bool,
    /// Page Size (bit 7): selects a large leaf at PDPT/PD level. Always zero
    /// in the trees built here; every mapping is a 4 KiB leaf.
    pub large_page: bool,
    /// Global (bit 8): TLB entry survives a CR3 reload (leaf entries only).
    pub global_translation: bool,

    /// OS-available bits 9..11.
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical address bits 51:12 (4 KiB aligned table or frame base).
    #[bits(40)]
    phys_addr_bits_51_12: u64,

    /// OS-available bits 52..58.
    #[bits(7)]
    pub os_available_high: u8,

    /// Protection key (bits 59..62, leaf entries with PKU only).
    #[bits(4)]
    pub protection_key: u8,

    /// No-Execute (bit 63). Requires `EFER.NXE`; never set by the builders.
    pub no_execute: bool,
}

impl PageEntryBits {
    /// Store a 4 KiB-aligned physical base into the address field.
    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        debug_assert!(pa.is_page_aligned());
        self.set_phys_addr_bits_51_12(pa.as_u64() >> 12);
    }

    /// Store a 4 KiB-aligned physical base, builder style.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, pa: PhysicalAddress) -> Self {
        self.set_physical_address(pa);
        self
    }

    /// The physical base held in the address field.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.phys_addr_bits_51_12() << 12)
    }

    /// Supervisor read/write entry: the flags used for every entry of the
    /// kernel identity tree, leaf and non-leaf alike.
    #[inline]
    #[must_use]
    pub const fn new_common_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }

    /// User read/write entry: the flags used for every entry of the user
    /// window tree. Execution stays permitted since the user binary runs
    /// from these pages.
    #[inline]
    #[must_use]
    pub const fn new_user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_round_trip_is_identity() {
        let samples = [
            0u64,
            1,
            0x0000_0000_0000_0007, // present | writable | user
            0x8000_0000_DEAD_B007, // NX plus arbitrary address/flag bits
            0x7FFF_FFFF_FFFF_F000, // maximal address field, no flags
            u64::MAX,
        ];
        for raw in samples {
            assert_eq!(PageEntryBits::from_bits(raw).into_bits(), raw);
        }
    }

    #[test]
    fn address_field_is_shifted_not_masked_flags() {
        let pa = PhysicalAddress::new(0x0000_0001_2345_6000);
        let e = PageEntryBits::new_common_rw().with_physical_address(pa);
        assert_eq!(e.physical_address(), pa);
        assert!(e.present());
        assert!(e.writable());
        assert!(!e.user_access());
        // Flags live below bit 12 and above bit 51; the address field must
        // not disturb them.
        assert_eq!(e.into_bits() & 0xFFF, 0b11);
        assert!(!e.no_execute());
    }

    #[test]
    fn user_preset_sets_user_bit_and_keeps_execute() {
        let e = PageEntryBits::new_user_rw();
        assert_eq!(e.into_bits() & 0xFFF, 0b111);
        assert!(!e.no_execute());
        assert!(!e.large_page());
    }
}
