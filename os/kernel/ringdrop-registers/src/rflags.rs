use bitfield_struct::bitfield;

/// Architectural RFLAGS model for x86-64.
///
/// Used to compose the flags image pushed for the first `iretq` into user
/// mode and the mask programmed into `IA32_FMASK`. Bits that are fixed in
/// 64-bit mode carry defaults and are not writable.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Rflags {
    /// Carry Flag.
    pub cf_carry: bool, // 0

    /// Always 1 in 64-bit mode.
    #[bits(default = true)]
    _always1: bool, // 1

    /// Parity Flag.
    pub pf_parity: bool, // 2

    #[bits(default = false)]
    _rsvd3: bool, // 3

    /// Adjust Flag.
    pub af_adjust: bool, // 4

    #[bits(default = false)]
    _rsvd5: bool, // 5

    /// Zero Flag.
    pub zf_zero: bool, // 6

    /// Sign Flag.
    pub sf_sign: bool, // 7

    /// Trap Flag (single-step).
    pub tf_trap: bool, // 8

    /// Interrupt Enable Flag.
    pub if_interrupt_enable: bool, // 9

    /// Direction Flag.
    pub df_direction: bool, // 10

    /// Overflow Flag.
    pub of_overflow: bool, // 11

    /// I/O Privilege Level.
    #[bits(2)]
    pub iopl: u8, // 12-13

    /// Nested Task.
    pub nt_nested: bool, // 14

    #[bits(default = false)]
    _rsvd15: bool, // 15

    /// Resume Flag.
    pub rf_resume: bool, // 16

    /// Virtual-8086 mode; must stay 0 in 64-bit mode.
    #[bits(default = false)]
    _vm: bool, // 17

    /// Alignment Check.
    pub ac_alignment_check: bool, // 18

    /// Virtual Interrupt Flag.
    pub vif_virtual_interrupt: bool, // 19

    /// Virtual Interrupt Pending.
    pub vip_virtual_interrupt_pending: bool, // 20

    /// ID Flag: CPUID toggle detection.
    pub id_cpuid: bool, // 21

    /// Bits 22–63 — Reserved, zero.
    #[bits(42, default = false)]
    _reserved_rest: u64,
}

impl Rflags {
    /// The flags image for freshly entered user code: interrupts enabled,
    /// everything else at its architectural default.
    #[must_use]
    pub const fn user_default() -> Self {
        Self::new().with_if_interrupt_enable(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn user_default_is_0x202() {
        assert_eq!(Rflags::user_default().into_bits(), 0x202);
    }

    #[test]
    fn reserved_always_one_bit_is_set_by_default() {
        assert_eq!(Rflags::new().into_bits(), 0x2);
    }
}
