//! # User window layout
//!
//! The user program lives in a single high "window": the top 1 GiB of the
//! canonical 64-bit virtual range. All constants in this module are **virtual**
//! addresses; the physical pages behind them come from the boot handoff.
//!
//! Within the window, only the first 2 MiB slice (one page table, 512 leaf
//! slots) is ever backed:
//!
//! ```text
//! slot   0  user stack        (one page; the stack grows down from slot 1)
//! slot   1  user binary       (entry point at its first byte)
//! slot 2..  user binary       (remaining pages, contiguous)
//! slot 511  demand page       (unmapped at boot; faulted in on first touch)
//! ```

/// Size of one leaf page in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// Virtual base of the user window (top 1 GiB of the address space).
pub const USER_WINDOW_BASE: u64 = 0xFFFF_FFFF_C000_0000;

/// Number of leaf slots a single page table contributes to the window.
pub const USER_WINDOW_SLOTS: usize = 512;

/// Virtual entry point of the user binary: one page past the window base,
/// leaving slot 0 for the user stack. The same value doubles as the initial
/// user stack top.
pub const USER_ENTRY: u64 = USER_WINDOW_BASE + PAGE_SIZE;

/// Virtual base of the demand-mapped page: the last leaf slot of the window's
/// page table. Left unmapped at boot; the first access faults and the kernel
/// maps the reserved spare page here.
pub const DEMAND_PAGE: u64 = USER_WINDOW_BASE + (USER_WINDOW_SLOTS as u64 - 1) * PAGE_SIZE;

// The window is exactly the top gigabyte: 1 GiB-aligned and ending at the
// address-space wraparound.
const _: () = assert!(USER_WINDOW_BASE % (1 << 30) == 0);
const _: () = assert!(USER_WINDOW_BASE.wrapping_add(1 << 30) == 0);
const _: () = assert!(DEMAND_PAGE == 0xFFFF_FFFF_C01F_F000);
const _: () = assert!(USER_ENTRY == 0xFFFF_FFFF_C000_1000);
