//! The kernel's thread-local block and the GS base that finds it.
//!
//! The `syscall` instruction arrives with the user stack still in RSP and
//! only RCX and R11 consumed. The entry stub needs a kernel stack and a
//! place to stash the user RSP before it can push anything, and the only
//! registers it may scribble on are `gs:`-relative slots. This module owns
//! that block.
//!
//! Both `IA32_GS_BASE` and `IA32_KERNEL_GS_BASE` are pointed at the same
//! block, so `gs:` references resolve identically whether or not a
//! `swapgs` ever executes. With a single CPU and a single block there is
//! nothing to swap between.

use crate::mem::IdentityMapper;
use core::mem::{offset_of, size_of};
use core::ptr::NonNull;
use core::sync::atomic::AtomicU64;
use ringdrop_abi::window::PAGE_SIZE;
use ringdrop_handoff::HandoffRecord;
use ringdrop_registers::msr::{Ia32GsBaseMsr, Ia32KernelGsBaseMsr};
use ringdrop_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use ringdrop_vmem::{PhysMapper, PhysicalAddress};

/// Per-CPU state reachable through `gs:`. One CPU, one block, one page.
#[repr(C, align(4096))]
pub struct TlsBlock {
    /// Pointer back to this block.
    pub myself: *mut TlsBlock,
    /// Kernel stack the syscall stub switches to.
    pub kernel_stack_top: u64,
    /// User RSP parked here between `syscall` and `sysretq`.
    pub saved_user_rsp: u64,
    /// Timer interrupts observed since boot.
    pub ticks: AtomicU64,
    _reserved: [u8; PAGE_SIZE as usize - 32],
}

const _: () = assert!(size_of::<TlsBlock>() == PAGE_SIZE as usize);

/// `gs:`-relative offset of [`TlsBlock::kernel_stack_top`].
pub const KERNEL_STACK_TOP_OFFSET: usize = offset_of!(TlsBlock, kernel_stack_top);
/// `gs:`-relative offset of [`TlsBlock::saved_user_rsp`].
pub const SAVED_USER_RSP_OFFSET: usize = offset_of!(TlsBlock, saved_user_rsp);

impl TlsBlock {
    /// The block the GS base points at.
    ///
    /// # Panics
    /// Debug-asserts that [`init_tls`] has run; before that the MSR is
    /// whatever the firmware left behind.
    pub fn current() -> &'static Self {
        let ptr = unsafe { Ia32GsBaseMsr::load_unsafe() }.ptr() as *const Self;
        debug_assert!(!ptr.is_null(), "TLS block pointer is unset");
        unsafe { &*ptr }
    }
}

/// Place the block into the loader's TLS page and aim both GS base MSRs
/// at it.
///
/// # Safety
/// CPL0 only. The handoff TLS region must be an identity-mapped page that
/// nothing else owns; call once, before the syscall MSRs are enabled and
/// before interrupts are.
pub unsafe fn init_tls(handoff: &HandoffRecord) -> &'static TlsBlock {
    let base = PhysicalAddress::new(handoff.tls.base);
    let block: &'static mut TlsBlock = unsafe { IdentityMapper.phys_to_mut(base) };
    let myself = core::ptr::from_mut::<TlsBlock>(&mut *block);

    *block = TlsBlock {
        myself,
        kernel_stack_top: handoff.kernel_stack.top,
        saved_user_rsp: 0,
        ticks: AtomicU64::new(0),
        _reserved: [0; PAGE_SIZE as usize - 32],
    };

    let ptr = NonNull::from(&mut *block);
    unsafe {
        Ia32GsBaseMsr::new().with_gs_base(ptr).store_unsafe();
        Ia32KernelGsBaseMsr::new().with_gs_base(ptr).store_unsafe();
    }
    block
}
