//! Privilege levels as they appear in selectors and descriptors.
//!
//! The same two-bit ring number shows up in two places with different
//! widths: as the RPL field of a 16-bit segment selector and as the DPL
//! field of a 64-bit descriptor. Both get their own codec type so the
//! `bitfield` fields in [`crate::gdt`] stay strongly typed.

/// Requested privilege level: bits `[1:0]` of a segment selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Rpl {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Rpl {
    pub(crate) const fn into_bits(self) -> u16 {
        self as u16
    }

    pub(crate) const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

/// Descriptor privilege level: bits `[46:45]` of a segment descriptor.
///
/// The codec works in `u64` because that is the storage type of the
/// descriptor bitfields it is embedded in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Dpl {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Dpl {
    pub(crate) const fn into_bits(self) -> u64 {
        self as u64
    }

    pub(crate) const fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

/// The ring the kernel runs in.
pub const KERNEL_RPL: Rpl = Rpl::Ring0;

/// The ring user code is dropped into.
pub const USER_RPL: Rpl = Rpl::Ring3;
