//! The 16-byte system descriptor pointing at the TSS.
//!
//! System descriptors kept their full base field in long mode, so unlike
//! code and data entries this one spans two GDT slots and really does
//! carry the TSS address and limit.

#![allow(dead_code)]

use crate::privilege::Dpl;
use bitfield_struct::bitfield;
use ringdrop_vmem::VirtualAddress;

/// Low 8 bytes of an *Available 64-bit TSS* descriptor (type 0x9, S=0).
#[bitfield(u64)]
pub struct TssDescLow {
    pub limit_lo: u16, // [15:0]
    pub base_lo: u16,  // [31:16]
    pub base_mid: u8,  // [39:32]
    #[bits(4)]
    pub typ: u8, // [43:40]  0x9 = available 64-bit TSS
    pub s: bool,       // [44]     0 = system descriptor
    #[bits(2)]
    pub dpl: Dpl, // [46:45]
    pub p: bool,       // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,     // [52]
    pub zero1: bool,   // [53]     must be 0 for system types
    pub zero2: bool,   // [54]     must be 0 for system types
    pub g: bool,       // [55]     0 = byte granularity
    pub base_hi: u8,   // [63:56]
}

/// High 8 bytes: `base[63:32]` plus a reserved word.
#[bitfield(u64)]
pub struct TssDescHigh {
    pub base_upper: u32, // [31:0]
    reserved: u32,       // [63:32] must be 0
}

/// The full two-slot TSS descriptor.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct TssDesc64 {
    pub low: TssDescLow,
    pub high: TssDescHigh,
}

impl TssDesc64 {
    /// Describe the TSS at `tss_base` spanning `tss_limit + 1` bytes.
    #[must_use]
    pub const fn new(tss_base: VirtualAddress, tss_limit: u32) -> Self {
        let limit_lo = (tss_limit & 0xFFFF) as u16;
        let limit_hi = ((tss_limit >> 16) & 0xF) as u8;

        let base = tss_base.as_u64();
        let base_lo = (base & 0xFFFF) as u16;
        let base_mid = ((base >> 16) & 0xFF) as u8;
        let base_hi = ((base >> 24) & 0xFF) as u8;
        let base_upper = (base >> 32) as u32;

        let low = TssDescLow::new()
            .with_limit_lo(limit_lo)
            .with_base_lo(base_lo)
            .with_base_mid(base_mid)
            .with_typ(0x9)
            .with_s(false)
            .with_dpl(Dpl::Ring0)
            .with_p(true)
            .with_limit_hi(limit_hi)
            .with_base_hi(base_hi);

        let high = TssDescHigh::new().with_base_upper(base_upper);

        Self { low, high }
    }
}

const _: () = {
    assert!(size_of::<TssDescLow>() == 8);
    assert!(size_of::<TssDescHigh>() == 8);
    assert!(size_of::<TssDesc64>() == 16);
};
