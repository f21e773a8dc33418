//! Provides the [`Ia32GsBaseMsr`] type.

use crate::msr::{Msr, is_canonical_gs_base};
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use core::ptr::NonNull;

/// Model-Specific Register: the current **GS base address** (MSR
/// `0xC000_0101`).
///
/// The CPU resolves `gs:`-relative memory references against this value.
/// The bootstrap points it at the per-CPU block so entry stubs can reach
/// their scratch fields without touching general registers first.
#[bitfield(u64, order = Lsb)]
pub struct Ia32GsBaseMsr {
    #[bits(64)]
    pub ptr: u64,
}

impl Ia32GsBaseMsr {
    pub const IA32_GS_BASE: u32 = 0xC000_0101;
    pub const MSR: Msr = Msr::new(Self::IA32_GS_BASE);

    /// Point the GS base at `base`. The address must be canonical
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
impl LoadRegisterUnsafe for Ia32GsBaseMsr {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn load_unsafe() -> Self {
        let msr = unsafe { Self::MSR.load_raw() };
        Self::from_bits(msr)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Ia32GsBaseMsr {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn store_unsafe(self) {
        unsafe { Self::MSR.store_raw(self.into_bits()) }
    }
}
