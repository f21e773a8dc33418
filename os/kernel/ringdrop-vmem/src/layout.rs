//! # Address-space layout
//!
//! Fixed sizing of the two trees. The kernel tree identity-maps the low
//! 4 GiB; the user tree backs the top-1-GiB window whose virtual constants
//! live in [`ringdrop_abi::window`].
//!
//! ## Kernel tree (identity, 4 GiB)
//!
//! ```text
//! 4 GiB / 4 KiB      = 1_048_576 PTEs
//! 1_048_576 / 512    =     2_048 page tables (and as many PDEs)
//! 2_048 / 512        =         4 page directories (and as many PDPEs)
//!                            1 PDPT, 1 PML4
//! ```
//!
//! ## User tree (window)
//!
//! One table per level: the whole backed span is a single 2 MiB slice, so
//! one PT suffices, reached through PD slot 0, PDPT slot 511 and PML4 slot
//! 511. PML4 slot 0 is reserved for the kernel cross-link.

use crate::addr::VirtualAddress;
use crate::arena::ArenaShape;
use crate::table::{ENTRIES_PER_TABLE, L1Index, L2Index, L3Index, L4Index};
use ringdrop_abi::window::{DEMAND_PAGE, PAGE_SIZE, USER_ENTRY, USER_WINDOW_BASE};

/// Ceiling of the kernel identity mapping.
pub const KERNEL_IDENTITY_BYTES: u64 = 4 << 30;

/// Leaf entries in the kernel tree.
#[allow(clippy::cast_possible_truncation)]
pub const KERNEL_NUM_PTES: usize = (KERNEL_IDENTITY_BYTES / PAGE_SIZE) as usize;

/// Page tables in the kernel tree.
pub const KERNEL_NUM_PTS: usize = KERNEL_NUM_PTES / ENTRIES_PER_TABLE;

/// Page directories in the kernel tree.
pub const KERNEL_NUM_PDS: usize = KERNEL_NUM_PTS / ENTRIES_PER_TABLE;

const _: () = assert!(KERNEL_NUM_PTES == 1 << 20);
const _: () = assert!(KERNEL_NUM_PTS == 2048);
const _: () = assert!(KERNEL_NUM_PDS == 4);
// The identity range must tile exactly into tables at every level.
const _: () = assert!(KERNEL_NUM_PTES % ENTRIES_PER_TABLE == 0);
const _: () = assert!(KERNEL_NUM_PTS % ENTRIES_PER_TABLE == 0);

/// Arena shape for the kernel tree.
#[must_use]
pub const fn kernel_arena_shape() -> ArenaShape {
    ArenaShape {
        num_pts: KERNEL_NUM_PTS,
        num_pds: KERNEL_NUM_PDS,
        num_pdpts: 1,
        num_pml4s: 1,
    }
}

/// Scratch pages the kernel tree occupies (2054).
pub const KERNEL_TABLE_PAGES: usize = kernel_arena_shape().total_pages();

const _: () = assert!(KERNEL_TABLE_PAGES == 2054);

/// Arena shape for the user tree.
#[must_use]
pub const fn user_arena_shape() -> ArenaShape {
    ArenaShape {
        num_pts: 1,
        num_pds: 1,
        num_pdpts: 1,
        num_pml4s: 1,
    }
}

/// Scratch pages the user tree occupies.
pub const USER_TABLE_PAGES: usize = user_arena_shape().total_pages();

/// PML4 slot carrying the user window.
pub const WINDOW_PML4_SLOT: usize = 511;

/// PDPT slot carrying the user window.
pub const WINDOW_PDPT_SLOT: usize = 511;

/// PD slot carrying the window's single page table.
pub const WINDOW_PD_SLOT: usize = 0;

/// User PML4 slot holding the verbatim copy of the kernel root entry.
pub const KERNEL_LINK_PML4_SLOT: usize = 0;

/// PT slot of the demand-mapped page (last leaf of the window's slice).
pub const DEMAND_PAGE_SLOT: usize = 511;

// Re-derive the slot constants from the published virtual layout; the
// builders rely on these equalities.
const WINDOW_SPLIT: (L4Index, L3Index, L2Index, L1Index) =
    crate::table::split_indices(VirtualAddress::new(USER_WINDOW_BASE));
const _: () = assert!(WINDOW_SPLIT.0.as_usize() == WINDOW_PML4_SLOT);
const _: () = assert!(WINDOW_SPLIT.1.as_usize() == WINDOW_PDPT_SLOT);
const _: () = assert!(WINDOW_SPLIT.2.as_usize() == WINDOW_PD_SLOT);
const _: () = assert!(WINDOW_SPLIT.3.as_usize() == 0);

const DEMAND_SPLIT: (L4Index, L3Index, L2Index, L1Index) =
    crate::table::split_indices(VirtualAddress::new(DEMAND_PAGE));
const _: () = assert!(DEMAND_SPLIT.0.as_usize() == WINDOW_PML4_SLOT);
const _: () = assert!(DEMAND_SPLIT.1.as_usize() == WINDOW_PDPT_SLOT);
const _: () = assert!(DEMAND_SPLIT.2.as_usize() == WINDOW_PD_SLOT);
const _: () = assert!(DEMAND_SPLIT.3.as_usize() == DEMAND_PAGE_SLOT);

const _: () = assert!(USER_ENTRY == USER_WINDOW_BASE + PAGE_SIZE);

// The kernel cross-link and the window must occupy different PML4 slots.
const _: () = assert!(KERNEL_LINK_PML4_SLOT != WINDOW_PML4_SLOT);
