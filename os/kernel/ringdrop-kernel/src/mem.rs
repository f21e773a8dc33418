//! Physical memory access for an identity-mapped kernel.
//!
//! Page-table construction needs to dereference physical frame addresses.
//! Both the firmware mapping we boot under and the kernel tables we build
//! map the low 4 GiB at equal virtual and physical addresses, so the
//! conversion is the cast itself. The mapping strategy lives behind
//! [`PhysMapper`] so the table builders stay oblivious to it.

use ringdrop_vmem::{PhysMapper, PhysicalAddress};

/// [`PhysMapper`] for the identity-mapped low 4 GiB.
///
/// # Safety
/// The referenced physical range must lie inside the identity mapping and
/// must be valid for the access implied by `T`.
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let va = pa.as_u64() as *mut T;
        // SAFETY: caller guarantees the frame is identity-mapped and valid for T.
        unsafe { &mut *va }
    }
}
