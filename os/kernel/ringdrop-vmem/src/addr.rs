//! Physical and virtual address newtypes.
//!
//! Thin `u64` wrappers that keep the two address kinds from mixing. No
//! canonicality or range checks are applied here; alignment checks happen
//! where alignment matters (arena construction, entry encoding).

use core::fmt::{Debug, Display, Formatter};

/// A physical memory address.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    /// Create an address from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// The raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether the address is 4 KiB aligned.
    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 % 4096 == 0
    }

    /// The address rounded down to its 4 KiB page base.
    #[inline]
    #[must_use]
    pub const fn page_base(self) -> Self {
        Self(self.0 & !0xFFF)
    }

    /// The address advanced by `pages` whole 4 KiB pages.
    #[inline]
    #[must_use]
    pub const fn add_pages(self, pages: u64) -> Self {
        Self(self.0 + pages * 4096)
    }

    /// Codec for use as a `bitfield` field type.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Codec for use as a `bitfield` field type.
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u64 {
        self.0
    }
}

impl Debug for PhysicalAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl Display for PhysicalAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(addr: u64) -> Self {
        Self::new(addr)
    }
}

/// A virtual memory address.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    /// Create an address from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// The raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The byte offset within the containing 4 KiB page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & 0xFFF
    }

    /// The address rounded down to its 4 KiB page base.
    #[inline]
    #[must_use]
    pub const fn page_base(self) -> Self {
        Self(self.0 & !0xFFF)
    }

    /// Codec for use as a `bitfield` field type.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Codec for use as a `bitfield` field type.
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u64 {
        self.0
    }
}

impl Debug for VirtualAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "VA(0x{:016X})", self.0)
    }
}

impl Display for VirtualAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(addr: u64) -> Self {
        Self::new(addr)
    }
}
