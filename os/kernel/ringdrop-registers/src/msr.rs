//! # Model-Specific Registers
//!
//! Raw `rdmsr`/`wrmsr` access behind the [`Msr`] index type, plus typed
//! wrappers for the MSRs the bootstrap programs: the `SYSCALL` entry block
//! (`IA32_STAR`, `IA32_LSTAR`, `IA32_FMASK`), the two GS bases that back
//! `gs:`-relative per-CPU data, and the x2APIC register block.
//!
//! On a user-to-kernel transition via `syscall`, a kernel that keeps
//! different values in `IA32_GS_BASE` and `IA32_KERNEL_GS_BASE` executes
//! `swapgs` to exchange them. This kernel programs both bases to the same
//! per-CPU block instead, which makes the entry path `swapgs`-free.

mod ia32_apic_base;
mod ia32_fmask;
mod ia32_gs_base;
mod ia32_kernel_gs_base;
mod ia32_lstar;
mod ia32_star;
pub mod x2apic;

pub use ia32_apic_base::Ia32ApicBase;
pub use ia32_fmask::Ia32Fmask;
pub use ia32_gs_base::Ia32GsBaseMsr;
pub use ia32_kernel_gs_base::Ia32KernelGsBaseMsr;
pub use ia32_lstar::Ia32LStar;
pub use ia32_star::Ia32Star;

/// Identifies a Model-Specific Register by its architectural index, as
/// consumed by `rdmsr` and `wrmsr` through `ecx`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msr(pub u32);

impl Msr {
    /// Creates an `Msr` from a raw index.
    #[inline(always)]
    #[allow(clippy::inline_always)]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The underlying raw MSR index.
    #[inline(always)]
    #[allow(clippy::inline_always)]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Write a 64-bit value to this MSR.
    ///
    /// # Safety
    /// - `WRMSR` is privileged; executing it above CPL0 raises #GP(0).
    /// - The index must name a valid, writable MSR on this CPU; writing a
    ///   reserved index also raises #GP.
    /// - Callers must order the write against anything that consumes the
    ///   MSR's value (for example a GS base against `gs:` references).
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    #[doc(alias = "wrmsr")]
    pub unsafe fn store_raw(self, val: u64) {
        let lo = (val & 0xFFFF_FFFF) as u32;
        let hi = (val >> 32) as u32;
        let msr = self.raw();
        unsafe {
            core::arch::asm!(
            "wrmsr",
            in("ecx") msr,
            in("eax") lo,
            in("edx") hi,
            options(nostack, preserves_flags)
            );
        }
    }

    /// Read the 64-bit value of this MSR.
    ///
    /// # Safety
    /// `RDMSR` is privileged, and the index must name a valid MSR on this
    /// CPU.
    #[inline(always)]
    #[allow(clippy::inline_always)]
    #[doc(alias = "rdmsr")]
    pub unsafe fn load_raw(self) -> u64 {
        let lo: u32;
        let hi: u32;
        let ecx = self.raw();
        unsafe {
            core::arch::asm!(
            "rdmsr",
            in("ecx") ecx,
            out("eax") lo,
            out("edx") hi,
            options(nomem, nostack, preserves_flags)
            );
        }
        (u64::from(hi) << 32) | u64::from(lo)
    }
}

/// Canonical if bits 63..48 are all copies of bit 47.
#[inline(always)]
#[allow(clippy::inline_always)]
pub const fn is_canonical_gs_base(addr: u64) -> bool {
    let sign = (addr >> 47) & 1;
    (addr >> 48) == if sign == 0 { 0 } else { 0xFFFF }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonical_check_covers_both_halves() {
        assert!(is_canonical_gs_base(0));
        assert!(is_canonical_gs_base(0x0000_7FFF_FFFF_FFFF));
        assert!(is_canonical_gs_base(0xFFFF_8000_0000_0000));
        assert!(is_canonical_gs_base(0xFFFF_FFFF_C000_0000));
        assert!(!is_canonical_gs_base(0x0000_8000_0000_0000));
        assert!(!is_canonical_gs_base(0x1234_0000_0000_0000));
    }
}
