//! # UEFI loader
//!
//! Boots the kernel: reads the two flat binaries off the boot volume,
//! negotiates a video mode, allocates every physical region the kernel
//! runs on, fills in the handoff record, leaves firmware control and
//! jumps to the kernel's first byte.
//!
//! The kernel image is linked for [`KERNEL_LOAD_BASE`] and copied exactly
//! there; the user image is position-dependent too but the kernel maps it
//! into the user window wherever it physically lands, so any pages do.
//! All policy lives in the constants below. Everything downstream of the
//! jump is the kernel's problem.

#![no_std]
#![no_main]

extern crate alloc;

mod error;
mod file_system;
mod framebuffer;
mod memory;

use crate::error::LoaderError;
use crate::file_system::load_file;
use crate::framebuffer::negotiate_framebuffer;
use alloc::boxed::Box;
use core::convert::Infallible;
use log::{error, info};
use ringdrop_handoff::{
    HandoffRecord, KERNEL_LOAD_BASE, KernelEntryFn, Region, UserTableCounts,
};
use ringdrop_vmem::layout::{KERNEL_TABLE_PAGES, USER_TABLE_PAGES};
use uefi::prelude::*;
use uefi::{CStr16, boot, cstr16};

/// Boot volume path of the kernel image.
const KERNEL_PATH: &CStr16 = cstr16!("\\EFI\\BOOT\\KERNEL");
/// Boot volume path of the user program image.
const USER_PATH: &CStr16 = cstr16!("\\EFI\\BOOT\\USER");
/// Ring-0 stack handed to the kernel entry, in pages.
const KERNEL_STACK_PAGES: usize = 16;
/// Ring-0 stack taken on interrupts arriving from ring 3, in pages.
const TSS_STACK_PAGES: usize = 8;
/// The user stack; the window layout fixes it to a single page.
const USER_STACK_PAGES: usize = 1;
/// How long a fatal error stays readable before the loader gives up.
const FAILURE_STALL_USEC: usize = 5_000_000;

#[entry]
fn efi_main() -> Status {
    if uefi::helpers::init().is_err() {
        return Status::UNSUPPORTED;
    }

    let err = match boot() {
        Ok(never) => match never {},
        Err(err) => err,
    };
    error!("boot failed: {err} ({err:?})");
    boot::stall(FAILURE_STALL_USEC);
    err.into()
}

/// Everything between firmware init and the one-way jump.
fn boot() -> Result<Infallible, LoaderError> {
    info!("loader up, fetching images");
    let kernel_bytes = load_file(KERNEL_PATH)?;
    let user_bytes = load_file(USER_PATH)?;
    info!(
        "kernel {kernel} bytes, user {user} bytes",
        kernel = kernel_bytes.len(),
        user = user_bytes.len()
    );

    let fb = negotiate_framebuffer()?;
    info!(
        "framebuffer {width}x{height} at {base:p}",
        width = fb.width,
        height = fb.height,
        base = fb.base
    );

    memory::place_image_at("kernel image", KERNEL_LOAD_BASE, &kernel_bytes)?;
    let user_binary = memory::place_image("user image", &user_bytes)?;
    info!(
        "kernel image at {KERNEL_LOAD_BASE:#x}, user image at {base:#x} ({pages} pages)",
        base = user_binary.base,
        pages = user_binary.pages
    );

    let record = assemble_handoff(user_binary)?;
    record.validate()?;
    // Leaked into LOADER_DATA pool memory, which survives the exit below.
    let record: &'static HandoffRecord = Box::leak(Box::new(record));
    info!("handoff record at {record:p}");

    info!("leaving boot services");
    // After this call the firmware allocator and console are gone; the
    // record and every region it names are plain physical memory now.
    let _discarded_map = unsafe { boot::exit_boot_services(None) };

    // The kernel's entry instruction is the first byte of its image.
    let entry: KernelEntryFn =
        unsafe { core::mem::transmute::<u64, KernelEntryFn>(KERNEL_LOAD_BASE) };
    entry(
        record.kernel_stack.top as *mut u8,
        fb.base,
        fb.width,
        fb.height,
        record,
    )
}

/// Allocate the handoff regions and assemble the record.
///
/// The user-tree slot counts fall out of the allocation sizes: one leaf
/// per stack and binary page, one table at every interior level.
fn assemble_handoff(user_binary: Region) -> Result<HandoffRecord, LoaderError> {
    let kernel_stack = memory::alloc_stack("kernel stack", KERNEL_STACK_PAGES)?;
    let tss_stack = memory::alloc_stack("tss stack", TSS_STACK_PAGES)?;
    let user_stack = memory::alloc_stack("user stack", USER_STACK_PAGES)?;
    let kernel_tables = memory::alloc_region("kernel table scratch", KERNEL_TABLE_PAGES)?;
    let user_tables = memory::alloc_region("user table scratch", USER_TABLE_PAGES)?;
    let tss_segment = memory::alloc_region("tss segment", 1)?;
    let tls = memory::alloc_region("tls block", 1)?;
    let demand_page = memory::alloc_region("demand page", 1)?;
    let shared_page = memory::alloc_region("shared page", 1)?;

    let user_counts = UserTableCounts {
        ptes: user_stack.pages + user_binary.pages,
        pdes: 1,
        pdpes: 1,
        pml4es: 1,
    };

    Ok(HandoffRecord {
        kernel_stack,
        tss_stack,
        user_stack,
        kernel_tables,
        user_tables,
        user_binary,
        tss_segment,
        tls,
        demand_page: demand_page.base,
        shared_page: shared_page.base,
        user_counts,
    })
}
