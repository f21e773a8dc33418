//! Boot state shared with the interrupt handlers.
//!
//! The demand-fault handler runs long after [`crate::init`] returned into
//! ring 3, yet it must rebuild the user tree from the same arena and image
//! the bootstrap used. Everything it needs is captured once in a
//! [`BootContext`] and installed into static storage before interrupts are
//! enabled; handlers reach it through [`get`].

use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicBool, Ordering};
use ringdrop_handoff::HandoffRecord;
use ringdrop_vmem::{KernelTables, PhysicalAddress, TableArena, UserImage};

/// Everything the syscall and fault paths need after the bootstrap stack
/// is gone.
pub struct BootContext {
    /// The loader's handoff record, copied out of its boot-time page.
    pub handoff: HandoffRecord,
    /// The built kernel identity tree.
    pub kernel_tables: KernelTables,
    /// Scratch arena the user tree is (re)built from.
    pub user_arena: TableArena,
    /// Physical placement of the user stack, binary and demand frame.
    pub user_image: UserImage,
    /// Physical base of the active user PML4.
    pub user_pml4: PhysicalAddress,
    /// Set by the first demand fault; later hits on the page are genuine.
    pub demand_mapped: AtomicBool,
}

/// The global boot context.
static mut CONTEXT: MaybeUninit<BootContext> = MaybeUninit::uninit();
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the boot context once and hand back its final reference.
///
/// # Safety
/// Must be called exactly once, before interrupts are enabled. The write
/// must not race with [`get`], which is why installation precedes `sti`.
pub unsafe fn install(ctx: BootContext) -> &'static BootContext {
    #[allow(static_mut_refs)]
    unsafe {
        let slot = CONTEXT.write(ctx);
        INSTALLED.store(true, Ordering::Release);
        slot
    }
}

/// Borrow the installed boot context.
///
/// # Panics
/// If called before [`install`]. Interrupts are only enabled after
/// installation, so handlers can never observe the uninitialized state.
pub fn get() -> &'static BootContext {
    assert!(
        INSTALLED.load(Ordering::Acquire),
        "boot context not installed"
    );
    #[allow(static_mut_refs)]
    unsafe {
        CONTEXT.assume_init_ref()
    }
}
