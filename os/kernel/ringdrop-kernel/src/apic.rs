//! Local APIC bring-up, x2APIC mode only.
//!
//! The x2APIC register block is MSR-mapped, which keeps this module free
//! of MMIO plumbing: enable the APIC globally, software-enable it through
//! the spurious vector register and arm the periodic timer. Everything is
//! typed in [`ringdrop_registers::msr`]; this module just sequences it.

use crate::interrupts::spurious::SPURIOUS_VECTOR;
use crate::interrupts::timer::TIMER_VECTOR;
use log::info;
use ringdrop_registers::msr::x2apic::{
    self, DivideConfiguration, LvtTimer, SpuriousVector, X2APIC_ID, X2APIC_LVT_TIMER, X2APIC_SVR,
    X2APIC_TIMER_DIVIDE, X2APIC_TIMER_INITIAL_COUNT,
};
use ringdrop_registers::msr::Ia32ApicBase;
use ringdrop_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

/// Countdown reloaded into the timer, bus clock divided by 16.
///
/// On common virtual machines this lands in the tens-of-milliseconds
/// range. The exact rate is not load-bearing; the ticks only have to
/// arrive while ring 3 runs.
pub const TIMER_INITIAL_COUNT: u32 = 1_000_000;

/// Enable the x2APIC and arm the periodic timer.
///
/// # Safety
/// CPL0 only, interrupt gates for [`TIMER_VECTOR`] and [`SPURIOUS_VECTOR`]
/// already installed. On a CPU without x2APIC the mode write takes #GP,
/// which the diagnostic gates report.
pub unsafe fn init_apic() {
    unsafe {
        let base = Ia32ApicBase::load_unsafe()
            .with_extd(true)
            .with_global_enable(true);
        base.store_unsafe();
        debug_assert!(Ia32ApicBase::load_unsafe().extd(), "x2APIC mode not set");

        let apic_id = X2APIC_ID.load_raw();
        info!("x2APIC enabled, id {apic_id:#x}");

        let svr = SpuriousVector::new()
            .with_vector(SPURIOUS_VECTOR)
            .with_apic_software_enable(true);
        X2APIC_SVR.store_raw(u64::from(svr.into_bits()));

        // Divider and LVT first; writing the initial count starts the
        // countdown.
        X2APIC_TIMER_DIVIDE.store_raw(u64::from(DivideConfiguration::divide_by_16().into_bits()));
        X2APIC_LVT_TIMER.store_raw(u64::from(LvtTimer::periodic(TIMER_VECTOR).into_bits()));
        X2APIC_TIMER_INITIAL_COUNT.store_raw(u64::from(TIMER_INITIAL_COUNT));
    }
    info!(
        "periodic timer armed: vector {TIMER_VECTOR:#x}, initial count {TIMER_INITIAL_COUNT}, divide 16"
    );
}

/// Signal end-of-interrupt for the in-service interrupt.
///
/// # Safety
/// CPL0, x2APIC mode, exactly once per serviced interrupt.
pub unsafe fn end_of_interrupt() {
    unsafe { x2apic::signal_end_of_interrupt() }
}
