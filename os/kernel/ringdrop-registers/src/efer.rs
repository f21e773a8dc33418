use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// `IA32_EFER` (MSR `0xC000_0080`).
///
/// Extended Feature Enable Register. The bootstrap reads it to confirm
/// long mode and sets SCE before programming the `SYSCALL` MSRs.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Efer {
    /// Bit 0 — SCE: System Call Extensions.
    ///
    /// Enables `SYSCALL`/`SYSRET` when set.
    pub sce: bool,

    /// Bits 1–7 — Reserved (legacy AMD K6 bits; written as zero).
    #[bits(7)]
    reserved0: u8,

    /// Bit 8 — LME: Long Mode Enable.
    pub lme: bool,

    /// Bit 9 — Reserved.
    #[bits(access = RO)]
    reserved1: bool,

    /// Bit 10 — LMA: Long Mode Active (read-only).
    pub lma: bool,

    /// Bit 11 — NXE: No-Execute Enable.
    ///
    /// Enables the NX bit in page-table entries.
    pub nxe: bool,

    /// Bits 12–63 — Reserved and vendor extensions; preserved, not modeled.
    #[bits(52)]
    reserved2: u64,
}

impl Efer {
    /// MSR index for `IA32_EFER`.
    pub const MSR_EFER: u32 = 0xC000_0080;
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Efer {
    unsafe fn load_unsafe() -> Self {
        let (lo, hi): (u32, u32);
        unsafe {
            core::arch::asm!(
                "rdmsr",
                in("ecx") Self::MSR_EFER,
                out("eax") lo,
                out("edx") hi,
                options(nomem, preserves_flags)
            );
        }
        Self::from_bits(u64::from(hi) << 32 | u64::from(lo))
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Efer {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn store_unsafe(self) {
        let efer = self.into_bits();
        let lo = efer as u32;
        let hi = (efer >> 32) as u32;
        unsafe {
            core::arch::asm!(
                "wrmsr",
                in("ecx") Self::MSR_EFER,
                in("eax") lo,
                in("edx") hi,
                options(nomem, preserves_flags)
            );
        }
    }
}
