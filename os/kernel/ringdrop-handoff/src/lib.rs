//! # Loader-to-kernel handoff contract
//!
//! This crate defines the single structure the UEFI loader hands to the
//! kernel, plus the entry-point signature that carries it. It is the only
//! ABI shared between the two binaries, so everything here is `#[repr(C)]`
//! with fixed-size integers and no pointers to loader-owned memory.
//!
//! ## Protocol
//!
//! The loader allocates every physical region the kernel will ever use
//! (stacks, page-table scratch, the user image, the TSS and TLS buffers,
//! the spare demand page), fills in a [`HandoffRecord`], exits boot
//! services, and jumps to the kernel entry with the record's address as
//! the final argument. The record is populated exactly once; the kernel
//! copies it into its own state on entry and treats it as read-only from
//! then on, because the page-fault path needs it again long after the
//! loader's memory image has been repurposed.
//!
//! Fields describing stacks carry the *top* of the allocation (the value
//! that goes into a stack pointer); plain regions carry their lowest page.
//!
//! ## Validation
//!
//! [`HandoffRecord::validate`] checks internal consistency: page-aligned
//! bases, non-empty regions, and user-table slot counts that describe one
//! single-chain window with the top leaf slot left free for the demand
//! page. Region *sizing* against the paging layout is the kernel's
//! business and is enforced where the scratch arenas are constructed.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

mod record;

pub use record::{
    HandoffError, HandoffRecord, KERNEL_LOAD_BASE, KernelEntryFn, Region, StackRegion,
    UserTableCounts,
};
