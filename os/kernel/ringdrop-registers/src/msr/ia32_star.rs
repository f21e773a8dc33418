use crate::msr::Msr;
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// `IA32_STAR` — System Call Target & Segment Selectors (MSR `0xC000_0081`).
///
/// In 64-bit mode:
///
/// - `syscall` derives kernel CS/SS from `IA32_STAR[47:32]`,
/// - `sysret` derives user CS/SS from `IA32_STAR[63:48]`,
/// - the actual 64-bit entry RIP comes from `IA32_LSTAR`.
#[bitfield(u64)]
pub struct Ia32Star {
    /// Bits 0–31 — Compatibility-mode `syscall` EIP; unused by 64-bit
    /// `syscall`.
    #[bits(32, access = RO)]
    pub compat_syscall_eip: u32,

    /// Bits 32–47 — Kernel segment base for `syscall`:
    ///
    /// ```text
    ///   CS ← (this & 0xFFFC)
    ///   SS ← (this + 8)
    /// ```
    #[bits(16)]
    pub syscall_cs_selector: u16,

    /// Bits 48–63 — User segment base for `sysret`:
    ///
    /// ```text
    ///   CS ← (this + 16) | 3
    ///   SS ← (this +  8) | 3
    /// ```
    #[bits(16)]
    pub sysret_cs_selector: u16,
}

impl Ia32Star {
    /// MSR index for `IA32_STAR`.
    pub const IA32_STAR: u32 = 0xC000_0081;

    /// The MSR.
    pub const MSR: Msr = Msr::new(Self::IA32_STAR);

    /// Build a STAR value for a pure 64-bit kernel from the kernel and
    /// user code selectors.
    ///
    /// The GDT must place the user data segment directly below the user
    /// code segment, because `sysret` loads SS from `base + 8` and CS from
    /// `base + 16` and only their relative order is programmable.
    #[must_use]
    pub fn new_64bit_raw(kernel_cs: u16, user_cs: u16) -> Self {
        #[inline]
        const fn gdt_index(sel: u16) -> u16 {
            sel >> 3
        }

        #[inline]
        const fn rpl(sel: u16) -> u16 {
            sel & 0b11
        }

        let kidx = gdt_index(kernel_cs);
        let uidx = gdt_index(user_cs);

        debug_assert_ne!(kidx, 0);
        debug_assert_eq!(rpl(kernel_cs), 0, "kernel CS must be Ring0");
        debug_assert_ne!(uidx, 0, "user CS selector at GDT index 0 is invalid");

        // SS = (base + 8) | 3 must hit the user data segment, so the base
        // is the data-segment selector minus 8.
        let user_ss_index = uidx - 1;
        let base_no_rpl: u16 = (user_ss_index << 3).wrapping_sub(8);

        Self::new()
            .with_syscall_cs_selector(kernel_cs)
            .with_sysret_cs_selector(base_no_rpl)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Ia32Star {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn load_unsafe() -> Self {
        let msr = unsafe { Self::MSR.load_raw() };
        Self::from_bits(msr)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Ia32Star {
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
    fn sysret_base_recovers_user_selectors() {
        // Layout: null, kcode (0x08), kdata (0x10), udata (0x18), ucode (0x20).
        let star = Ia32Star::new_64bit_raw(0x08, 0x23);
        assert_eq!(star.syscall_cs_selector(), 0x08);

        let base = star.sysret_cs_selector();
        assert_eq!((base + 8) | 3, 0x1B, "SS must select user data, RPL3");
        assert_eq!((base + 16) | 3, 0x23, "CS must select user code, RPL3");
    }
}
