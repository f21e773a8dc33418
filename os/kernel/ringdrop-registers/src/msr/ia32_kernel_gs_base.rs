//! Provides the [`Ia32KernelGsBaseMsr`] type.

use crate::msr::{Msr, is_canonical_gs_base};
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use core::ptr::NonNull;

/// Model-Specific Register: the **swap value** for `swapgs` (MSR
/// `0xC000_0102`).
///
/// `swapgs` exchanges this with `IA32_GS_BASE`. This kernel writes the
/// same per-CPU pointer into both MSRs, so a stray `swapgs` (or one added
/// later) leaves `gs:` references working either way.
#[bitfield(u64, order = Lsb)]
pub struct Ia32KernelGsBaseMsr {
    #[bits(64)]
    pub ptr: u64,
}

impl Ia32KernelGsBaseMsr {
    pub const IA32_KERNEL_GS_BASE: u32 = 0xC000_0102;
    pub const MSR: Msr = Msr::new(Self::IA32_KERNEL_GS_BASE);

    /// Point the swap base at `base`. The address must be canonical
    /// (debug-checked).
    #[inline]
    #[must_use]
    pub fn with_gs_base<T>(self, base: NonNull<T>) -> Self {
        let addr = base.as_ptr() as u64;
        debug_assert!(
            is_canonical_gs_base(addr),
            "non-canonical GS base: {addr:#x}"
        );
        self.with_ptr(addr)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Ia32KernelGsBaseMsr {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn load_unsafe() -> Self {
        let msr = unsafe { Self::MSR.load_raw() };
        Self::from_bits(msr)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Ia32KernelGsBaseMsr {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn store_unsafe(self) {
        unsafe { Self::MSR.store_raw(self.into_bits()) }
    }
}
