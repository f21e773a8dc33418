use crate::msr::Msr;
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// `IA32_FMASK` — RFLAGS mask for `syscall` (MSR `0xC000_0084`).
///
/// On `syscall` the CPU computes `RFLAGS := RFLAGS & !IA32_FMASK`, so
/// every bit set here is cleared on entry to the kernel.
#[bitfield(u64, order = Lsb)]
pub struct Ia32Fmask {
    /// Carry Flag mask (bit 0).
    pub cf_carry: bool,

    /// Bit 1 — architecturally 1 in RFLAGS; must be 0 here.
    #[bits(default = false)]
    _bit1: bool,

    /// Parity Flag mask (bit 2).
    pub pf_parity: bool,

    #[bits(default = false)]
    _bit3: bool,

    /// Adjust Flag mask (bit 4).
    pub af_adjust: bool,

    #[bits(default = false)]
    _bit5: bool,

    /// Zero Flag mask (bit 6).
    pub zf_zero: bool,

    /// Sign Flag mask (bit 7).
    pub sf_sign: bool,

    /// Trap Flag mask (bit 8). Set so user single-stepping cannot follow
    /// `syscall` into the kernel.
    pub tf_trap: bool,

    /// Interrupt Enable mask (bit 9). Set so the kernel always enters
    /// with interrupts disabled and re-enables them on its own terms.
    pub if_interrupt_enable: bool,

    /// Direction Flag mask (bit 10).
    pub df_direction: bool,

    /// Overflow Flag mask (bit 11).
    pub of_overflow: bool,

    /// I/O Privilege Level mask (bits 12–13).
    #[bits(2)]
    pub iopl: u8,

    /// Nested Task mask (bit 14).
    pub nt_nested: bool,

    #[bits(default = false)]
    _bit15: bool,

    /// Resume Flag mask (bit 16).
    pub rf_resume: bool,

    /// Virtual-8086 mask (bit 17); must stay 0 in long mode.
    #[bits(default = false)]
    _vm: bool,

    /// Alignment Check mask (bit 18).
    pub ac_alignment_check: bool,

    /// Virtual Interrupt Flag mask (bit 19).
    pub vif_virtual_interrupt: bool,

    /// Virtual Interrupt Pending mask (bit 20).
    pub vip_virtual_interrupt_pending: bool,

    /// ID Flag mask (bit 21).
    pub id_cpuid: bool,

    /// Bits 22–63 — Reserved; must be zero.
    #[bits(42, default = false)]
    _reserved_rest: u64,
}

impl Ia32Fmask {
    /// MSR index for `IA32_FMASK`.
    pub const IA32_FMASK: u32 = 0xC000_0084;

    /// The MSR.
    pub const MSR: Msr = Msr::new(Self::IA32_FMASK);

    /// Mask only the interrupt flag: the entry stub runs with interrupts
    /// off until it has switched to the kernel stack, and the flags image
    /// preserved in `r11` restores IF on `sysretq`.
    #[must_use]
    pub const fn interrupts_off() -> Self {
        Self::new().with_if_interrupt_enable(true)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Ia32Fmask {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    unsafe fn load_unsafe() -> Self {
        let msr = unsafe { Self::MSR.load_raw() };
        Self::from_bits(msr)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Ia32Fmask {
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
    fn interrupts_off_masks_exactly_if() {
        assert_eq!(Ia32Fmask::interrupts_off().into_bits(), 1 << 9);
    }

    #[test]
    fn reserved_bits_cannot_be_masked() {
        // Bit 1 is architecturally 1 in RFLAGS and must stay clear here.
        assert_eq!(Ia32Fmask::new().into_bits(), 0);
    }
}
