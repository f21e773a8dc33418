//! # x2APIC register block
//!
//! In x2APIC mode the local APIC registers are MSR-mapped: legacy MMIO
//! register `0xNNN` becomes MSR `0x800 + (0xNNN >> 4)`. Only the registers
//! the bootstrap needs are modeled; everything else stays reachable through
//! the raw [`Msr`] indices.

use crate::msr::Msr;
use bitfield_struct::bitfield;

/// Local APIC ID (read-only).
pub const X2APIC_ID: Msr = Msr::new(0x802);

/// Local APIC version (read-only).
pub const X2APIC_VERSION: Msr = Msr::new(0x803);

/// End-of-interrupt register. Write-only; the written value must be 0.
pub const X2APIC_EOI: Msr = Msr::new(0x80B);

/// Spurious interrupt vector register.
pub const X2APIC_SVR: Msr = Msr::new(0x80F);

/// LVT timer register.
pub const X2APIC_LVT_TIMER: Msr = Msr::new(0x832);

/// Timer initial count.
pub const X2APIC_TIMER_INITIAL_COUNT: Msr = Msr::new(0x838);

/// Timer current count (read-only).
pub const X2APIC_TIMER_CURRENT_COUNT: Msr = Msr::new(0x839);

/// Timer divide configuration.
pub const X2APIC_TIMER_DIVIDE: Msr = Msr::new(0x83E);

/// Spurious Vector Register.
///
/// Carries the APIC software-enable bit next to the vector delivered for
/// spurious interrupts. The vector's low nibble reads as all-ones on real
/// hardware, which is why `0xFF` is the conventional choice.
#[bitfield(u32, order = Lsb)]
pub struct SpuriousVector {
    /// Bits 0–7 — Vector delivered for spurious interrupts.
    pub vector: u8,

    /// Bit 8 — APIC software enable.
    pub apic_software_enable: bool,

    /// Bit 9 — Focus processor checking (not used in x2APIC bootstraps).
    pub focus_checking: bool,

    /// Bits 10–11 — Reserved.
    #[bits(2)]
    reserved0: u8,

    /// Bit 12 — EOI broadcast suppression.
    pub eoi_broadcast_suppression: bool,

    /// Bits 13–31 — Reserved.
    #[bits(19)]
    reserved1: u32,
}

/// Delivery mode of the LVT timer entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum TimerMode {
    OneShot = 0b00,
    Periodic = 0b01,
    TscDeadline = 0b10,
}

impl TimerMode {
    const fn into_bits(self) -> u32 {
        self as u32
    }

    const fn from_bits(bits: u32) -> Self {
        match bits {
            0b01 => Self::Periodic,
            0b10 => Self::TscDeadline,
            _ => Self::OneShot,
        }
    }
}

/// LVT Timer Register.
#[bitfield(u32, order = Lsb)]
pub struct LvtTimer {
    /// Bits 0–7 — Vector delivered on timer expiry.
    pub vector: u8,

    /// Bits 8–11 — Reserved for the timer entry.
    #[bits(4)]
    reserved0: u8,

    /// Bit 12 — Delivery status (read-only).
    #[bits(access = RO)]
    pub delivery_status: bool,

    /// Bits 13–15 — Reserved.
    #[bits(3)]
    reserved1: u8,

    /// Bit 16 — Mask: no interrupt is delivered while set.
    pub masked: bool,

    /// Bits 17–18 — Timer mode.
    #[bits(2)]
    pub mode: TimerMode,

    /// Bits 19–31 — Reserved.
    #[bits(13)]
    reserved2: u16,
}

impl LvtTimer {
    /// An unmasked periodic timer firing `vector`.
    #[must_use]
    pub const fn periodic(vector: u8) -> Self {
        Self::new().with_vector(vector).with_mode(TimerMode::Periodic)
    }
}

/// Timer Divide Configuration Register.
///
/// The divider is encoded in bits `[1:0]` and bit `[3]`; bit 2 is skipped
/// by the architecture.
#[bitfield(u32, order = Lsb)]
pub struct DivideConfiguration {
    /// Bits 0–1 — Low two bits of the divider encoding.
    #[bits(2)]
    pub div_low: u8,

    /// Bit 2 — Reserved (always 0).
    #[bits(default = false, access = RO)]
    reserved0: bool,

    /// Bit 3 — High bit of the divider encoding.
    pub div_high: bool,

    /// Bits 4–31 — Reserved.
    #[bits(28)]
    reserved1: u32,
}

impl DivideConfiguration {
    /// Divide the bus clock by 16 (encoding `0b011`).
    #[must_use]
    pub const fn divide_by_16() -> Self {
        Self::new().with_div_low(0b11)
    }

    /// Divide the bus clock by 1 (encoding `0b111`).
    #[must_use]
    pub const fn divide_by_1() -> Self {
        Self::new().with_div_low(0b11).with_div_high(true)
    }
}

/// Signal end-of-interrupt to the local APIC.
///
/// # Safety
/// CPL0 only, and the APIC must be in x2APIC mode. Call once per serviced
/// interrupt, before `iretq`.
#[cfg(feature = "asm")]
#[inline]
pub unsafe fn signal_end_of_interrupt() {
    unsafe { X2APIC_EOI.store_raw(0) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn periodic_timer_encoding() {
        let lvt = LvtTimer::periodic(0x20);
        assert_eq!(lvt.into_bits(), (1 << 17) | 0x20);
        assert!(!lvt.masked());
        assert_eq!(lvt.mode(), TimerMode::Periodic);
    }

    #[test]
    fn divider_encodings_skip_bit_two() {
        assert_eq!(DivideConfiguration::divide_by_16().into_bits(), 0b0011);
        assert_eq!(DivideConfiguration::divide_by_1().into_bits(), 0b1011);
    }

    #[test]
    fn svr_enable_plus_vector() {
        let svr = SpuriousVector::new()
            .with_vector(0xFF)
            .with_apic_software_enable(true);
        assert_eq!(svr.into_bits(), 0x1FF);
    }
}
