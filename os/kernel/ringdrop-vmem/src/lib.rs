//! # x86-64 paging structures for the boot path
//!
//! This crate builds the two address spaces the kernel runs with:
//!
//! - a **kernel tree** that identity-maps a fixed low range of physical
//!   memory (4 GiB), and
//! - a **user tree** that backs the top-1-GiB user window and re-uses the
//!   kernel tree's root entry so kernel mappings stay visible after the
//!   CR3 switch.
//!
//! Both trees are laid out in caller-provided physical scratch regions
//! through a [`TableArena`], written through a [`PhysMapper`], and never
//! touched by hardware until the returned root is loaded into CR3. The
//! crate itself contains no privileged instructions, which is what makes
//! the builders testable on the host against simulated physical memory.
//!
//! ## Modules
//!
//! - [`addr`]: physical/virtual address newtypes.
//! - [`entry`]: the 64-bit entry codec shared by all four table levels.
//! - [`table`]: typed tables and index types per level.
//! - [`arena`]: deterministic table placement inside a scratch region.
//! - [`builder`]: the kernel identity and user window builders.
//! - [`address_space`]: software page walk over a built tree.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod addr;
pub mod address_space;
pub mod arena;
pub mod builder;
pub mod entry;
pub mod layout;
pub mod table;

pub use addr::{PhysicalAddress, VirtualAddress};
pub use address_space::AddressSpace;
pub use arena::{ArenaError, ArenaShape, TableArena, TableLevel};
pub use builder::{BuildError, KernelTables, UserImage, build_kernel_tables, build_user_tables};
pub use entry::PageEntryBits;

/// Gives the paging builders access to physical memory.
///
/// In the kernel this is backed by the identity mapping; in tests it is a
/// vector of simulated frames.
pub trait PhysMapper {
    /// Reinterpret the physical address as a `T` in the current address space.
    ///
    /// # Safety
    /// The caller must guarantee the physical address is mapped, properly
    /// aligned for `T`, and not aliased as a conflicting type for the
    /// duration of the returned borrow.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{PhysMapper, PhysicalAddress};

    /// One simulated physical frame.
    #[repr(align(4096))]
    #[derive(Clone)]
    pub struct Aligned4K(pub [u8; 4096]);

    /// A contiguous span of simulated physical memory starting at `base`.
    pub struct TestPhys {
        base: u64,
        frames: Box<[Aligned4K]>,
    }

    impl TestPhys {
        pub fn new(base: u64, frames: usize) -> Self {
            assert_eq!(base % 4096, 0, "base must be page-aligned");
            Self {
                base,
                frames: vec![Aligned4K([0u8; 4096]); frames].into_boxed_slice(),
            }
        }

        pub const fn base(&self) -> u64 {
            self.base
        }

        /// Raw bytes of the `idx`-th frame, for byte-exact comparisons.
        pub fn frame_bytes(&self, idx: usize) -> &[u8; 4096] {
            &self.frames[idx].0
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let off = pa
                .as_u64()
                .checked_sub(self.base)
                .expect("address below simulated range");
            let idx = usize::try_from(off / 4096).expect("frame index");
            let within = usize::try_from(off % 4096).expect("frame offset");
            assert!(idx < self.frames.len(), "address beyond simulated range");
            assert!(within + size_of::<T>() <= 4096, "access crosses a frame");
            let frame = core::ptr::from_ref(&self.frames[idx]).cast_mut().cast::<u8>();
            unsafe { &mut *frame.add(within).cast::<T>() }
        }
    }
}
