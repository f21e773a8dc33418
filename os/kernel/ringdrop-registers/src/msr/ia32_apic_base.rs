use crate::msr::Msr;
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// `IA32_APIC_BASE` (MSR `0x1B`).
///
/// Controls the local APIC's operating mode. Setting EN and EXTD together
/// puts the APIC into x2APIC mode, after which its registers are reached
/// as MSRs in the `0x800` block instead of MMIO.
#[bitfield(u64, order = Lsb)]
pub struct Ia32ApicBase {
    /// Bits 0–7 — Reserved.
    #[bits(8)]
    reserved0: u8,

    /// Bit 8 — BSP: this core is the bootstrap processor (read-only).
    pub bsp: bool,

    /// Bit 9 — Reserved.
    #[bits(default = false, access = RO)]
    reserved1: bool,

    /// Bit 10 — EXTD: enable x2APIC mode. Valid only together with EN;
    /// clearing EN while EXTD is set is #GP territory.
    pub extd: bool,

    /// Bit 11 — EN: APIC global enable.
    pub global_enable: bool,

    /// Bits 12–51 — APIC MMIO base >> 12 (xAPIC mode only; ignored once
    /// EXTD is set).
    #[bits(40)]
    pub apic_base_4k: u64,

    /// Bits 52–63 — Reserved.
    #[bits(12)]
    reserved2: u16,
}

impl Ia32ApicBase {
    /// MSR index for `IA32_APIC_BASE`.
    pub const IA32_APIC_BASE: u32 = 0x1B;

    /// The MSR.
    pub const MSR: Msr = Msr::new(Self::IA32_APIC_BASE);
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Ia32ApicBase {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn load_unsafe() -> Self {
        let msr = unsafe { Self::MSR.load_raw() };
        Self::from_bits(msr)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Ia32ApicBase {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn store_unsafe(self) {
        unsafe { Self::MSR.store_raw(self.into_bits()) }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn x2apic_enable_bits() {
        let v = Ia32ApicBase::new().with_global_enable(true).with_extd(true);
        assert_eq!(v.into_bits() & 0xC00, 0xC00);
    }
}
