//! 64-bit code and data descriptor encodings.
//!
//! Long mode ignores base and limit on code/data descriptors; paging does
//! the protection work. What still matters per entry:
//!
//! - **Type** (code vs data, readable/writable),
//! - **S** (code/data class, as opposed to system),
//! - **DPL** (which ring may load the selector),
//! - **P** (present),
//! - **L** (64-bit code; `DB` must be 0 alongside it).
//!
//! The constructors below pin those invariants so the table in
//! [`crate::gdt`] is assembled from whole valid entries, never loose bits.

// The bitfields generate accessors for every field; the kernel only calls
// a handful of them.
#![allow(dead_code)]

use crate::privilege::Dpl;
use bitfield_struct::bitfield;

/// Bit layout of a 64-bit code segment descriptor.
#[bitfield(u64)]
pub struct CodeDescBits {
    pub limit_lo: u16, // [15:0]   ignored in long mode
    pub base_lo: u16,  // [31:16]  ignored in long mode
    pub base_mid: u8,  // [39:32]
    #[bits(4)]
    pub typ: u8, // [43:40]  0b1010 = execute + read
    pub s: bool,       // [44]     1 = code/data
    #[bits(2)]
    pub dpl: Dpl, // [46:45]
    pub p: bool,       // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,     // [52]
    pub l: bool,       // [53]     1 = 64-bit code
    pub db: bool,      // [54]     must be 0 when L = 1
    pub g: bool,       // [55]
    pub base_hi: u8,   // [63:56]
}

/// Bit layout of a data/stack segment descriptor.
#[bitfield(u64)]
pub struct DataDescBits {
    pub limit_lo: u16, // [15:0]
    pub base_lo: u16,  // [31:16]
    pub base_mid: u8,  // [39:32]
    #[bits(4)]
    pub typ: u8, // [43:40]  0b0010 = read/write data
    pub s: bool,       // [44]
    #[bits(2)]
    pub dpl: Dpl, // [46:45]
    pub p: bool,       // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,     // [52]
    pub l: bool,       // [53]     0 for data
    pub db: bool,      // [54]     no meaning for 64-bit data
    pub g: bool,       // [55]
    pub base_hi: u8,   // [63:56]
}

/// One 8-byte GDT entry, viewable as code bits, data bits, or raw.
#[repr(C)]
#[derive(Copy, Clone)]
pub union Desc64 {
    pub raw: u64,
    pub code: CodeDescBits,
    pub data: DataDescBits,
}

impl Desc64 {
    /// The mandatory all-zero descriptor at GDT index 0.
    #[must_use]
    pub const fn null() -> Self {
        Self { raw: 0 }
    }

    /// A 64-bit code descriptor (execute + read, `L=1`, `DB=0`) for `dpl`.
    #[must_use]
    pub const fn from_code_dpl(dpl: Dpl) -> Self {
        let code = CodeDescBits::new()
            .with_typ(0b1010)
            .with_s(true)
            .with_dpl(dpl)
            .with_p(true)
            .with_l(true)
            .with_db(false);
        Self { code }
    }

    /// A data/stack descriptor (read/write, `L=0`) for `dpl`.
    #[must_use]
    pub const fn from_data_dpl(dpl: Dpl) -> Self {
        let data = DataDescBits::new()
            .with_typ(0b0010)
            .with_s(true)
            .with_dpl(dpl)
            .with_p(true);
        Self { data }
    }

    /// Raw 64-bit encoding; valid to read for every variant.
    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        unsafe { self.raw }
    }
}

// Size guards: each descriptor is exactly 8 bytes.
const _: () = {
    assert!(size_of::<CodeDescBits>() == 8);
    assert!(size_of::<DataDescBits>() == 8);
    assert!(size_of::<Desc64>() == 8);
};
