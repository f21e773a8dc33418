use crate::LoadRegisterUnsafe;
use ringdrop_vmem::VirtualAddress;

/// CR2 — Page-Fault Linear Address.
///
/// The CPU latches the faulting linear address here before vectoring to
/// the page-fault handler. Read it before anything that could fault again;
/// a nested page fault overwrites the value.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Cr2(VirtualAddress);

impl Cr2 {
    /// The faulting linear address.
    #[inline]
    #[must_use]
    pub const fn address(self) -> VirtualAddress {
        self.0
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr2 {
    unsafe fn load_unsafe() -> Self {
        let addr: u64;
        unsafe {
            core::arch::asm!("mov {}, cr2", out(reg) addr, options(nomem, nostack, preserves_flags));
        }
        Self(VirtualAddress::new(addr))
    }
}
