//! Physical page allocation for the handoff regions.
//!
//! Everything here allocates `LOADER_DATA` pages: the firmware keeps them
//! out of its own way until `ExitBootServices`, after which they are plain
//! physical memory the kernel owns via the handoff record.

#![allow(unsafe_code)]

use crate::error::LoaderError;
use ringdrop_handoff::{Region, StackRegion};
use uefi::boot::{self, AllocateType, MemoryType, PAGE_SIZE};

/// Allocate `pages` anywhere in physical memory.
///
/// # Errors
/// [`LoaderError::Allocation`] tagged with `what` on exhaustion.
pub fn alloc_region(what: &'static str, pages: usize) -> Result<Region, LoaderError> {
    let base = boot::allocate_pages(AllocateType::AnyPages, MemoryType::LOADER_DATA, pages)
        .map_err(|source| LoaderError::Allocation { what, source })?;
    Ok(Region {
        base: base.as_ptr() as u64,
        pages: pages as u64,
    })
}

/// Allocate a stack of `pages`, reported by its top as the kernel expects.
///
/// # Errors
/// [`LoaderError::Allocation`] tagged with `what` on exhaustion.
pub fn alloc_stack(what: &'static str, pages: usize) -> Result<StackRegion, LoaderError> {
    let region = alloc_region(what, pages)?;
    Ok(StackRegion {
        top: region.end(),
        pages: region.pages,
    })
}

/// Copy a loaded file into freshly allocated pages.
///
/// # Errors
/// [`LoaderError::Allocation`] tagged with `what` on exhaustion.
pub fn place_image(what: &'static str, bytes: &[u8]) -> Result<Region, LoaderError> {
    let region = alloc_region(what, bytes.len().div_ceil(PAGE_SIZE))?;
    unsafe {
        core::ptr::copy_nonoverlapping(bytes.as_ptr(), region.base as *mut u8, bytes.len());
    }
    Ok(region)
}

/// Copy a loaded file to a fixed physical base.
///
/// Used for the kernel image, which is linked for its load address and
/// cannot be relocated. The conventional low-memory base is free under
/// OVMF; another firmware squatting on it surfaces here as an allocation
/// failure rather than a silent misload.
///
/// # Errors
/// [`LoaderError::Allocation`] tagged with `what` when the range is taken.
pub fn place_image_at(what: &'static str, base: u64, bytes: &[u8]) -> Result<Region, LoaderError> {
    let pages = bytes.len().div_ceil(PAGE_SIZE);
    boot::allocate_pages(AllocateType::Address(base), MemoryType::LOADER_DATA, pages)
        .map_err(|source| LoaderError::Allocation { what, source })?;
    unsafe {
        core::ptr::copy_nonoverlapping(bytes.as_ptr(), base as *mut u8, bytes.len());
    }
    Ok(Region {
        base,
        pages: pages as u64,
    })
}
