//! # Tree builders
//!
//! Two pure builders over caller-provided scratch: the kernel identity tree
//! and the user window tree. Both write every table they own from scratch
//! on every call, so a rebuild with identical inputs is byte-identical to
//! the first build. That property is what lets the demand-fault path simply
//! re-run [`build_user_tables`] with one extra flag instead of patching a
//! live tree.
//!
//! Neither builder touches CR3; the returned root only becomes meaningful
//! once the caller loads it.

use crate::PhysMapper;
use crate::addr::PhysicalAddress;
use crate::arena::{ArenaError, TableArena};
use crate::entry::PageEntryBits;
use crate::layout::{
    DEMAND_PAGE_SLOT, KERNEL_LINK_PML4_SLOT, KERNEL_NUM_PDS, KERNEL_NUM_PTS, WINDOW_PD_SLOT,
    WINDOW_PDPT_SLOT, WINDOW_PML4_SLOT,
};
use crate::table::{
    ENTRIES_PER_TABLE, L1Index, L2Index, L3Index, L4Index, PageDirectory,
    PageDirectoryPointerTable, PageMapLevel4, PageTable, PdEntry, PdptEntry, Pml4Entry, PtEntry,
};
use log::debug;
use ringdrop_abi::window::{PAGE_SIZE, USER_WINDOW_SLOTS};

/// The built kernel identity tree.
#[derive(Debug, Copy, Clone)]
pub struct KernelTables {
    /// Physical base of the kernel PML4.
    pub pml4: PhysicalAddress,
}

/// Physical placement of the user program, as handed over by the loader.
#[derive(Debug, Copy, Clone)]
pub struct UserImage {
    /// Lowest physical page of the user stack.
    pub stack_base: PhysicalAddress,
    /// User stack pages; the stack occupies the window's first slots.
    pub stack_pages: usize,
    /// First physical page of the user binary.
    pub binary_base: PhysicalAddress,
    /// User binary pages, mapped contiguously after the stack.
    pub binary_pages: usize,
    /// The spare page reserved for the demand-fault path.
    pub demand_frame: PhysicalAddress,
}

/// Errors from the tree builders.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Stack plus binary do not fit the window's leaf slots.
    #[error("user window overflow: {requested} leaf slots requested, {available} available")]
    WindowOverflow { requested: usize, available: usize },
    /// A physical base in the image is not page-aligned.
    #[error("physical base {base:#x} is not page-aligned")]
    MisalignedBase { base: u64 },
    /// The scratch region cannot satisfy a table lookup.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Build the kernel identity tree: leaf *i* maps frame *i*, supervisor
/// read/write, across the whole 4 GiB ceiling.
///
/// Interior levels follow the arena's contiguous placement: entry *j* of a
/// PD points at the *j*-th PT, entry *j* of the PDPT at the *j*-th PD, and
/// PML4 slot 0 at the single PDPT.
///
/// # Errors
/// [`BuildError::Arena`] if the arena was sized below
/// [`kernel_arena_shape`](crate::layout::kernel_arena_shape).
#[allow(clippy::cast_possible_truncation, clippy::missing_panics_doc)]
pub fn build_kernel_tables<M: PhysMapper>(
    mapper: &M,
    arena: &TableArena,
) -> Result<KernelTables, BuildError> {
    let flags = PageEntryBits::new_common_rw();

    // L1: leaf i of table t maps frame t*512+i.
    for t in 0..KERNEL_NUM_PTS {
        let table: &mut PageTable = unsafe { mapper.phys_to_mut(arena.pt(t)?) };
        *table = PageTable::zeroed();
        for i in 0..ENTRIES_PER_TABLE {
            let frame = PhysicalAddress::new(((t * ENTRIES_PER_TABLE + i) as u64) * PAGE_SIZE);
            table.set(L1Index::new(i as u16), PtEntry::make_4k(frame, flags));
        }
    }

    // L2: entry j points at the j-th page table.
    for t in 0..KERNEL_NUM_PDS {
        let table: &mut PageDirectory = unsafe { mapper.phys_to_mut(arena.pd(t)?) };
        *table = PageDirectory::zeroed();
        for i in 0..ENTRIES_PER_TABLE {
            let j = t * ENTRIES_PER_TABLE + i;
            if j >= KERNEL_NUM_PTS {
                break;
            }
            table.set(L2Index::new(i as u16), PdEntry::make_next(arena.pt(j)?, flags));
        }
    }

    // L3: entry j points at the j-th page directory.
    let pdpt: &mut PageDirectoryPointerTable = unsafe { mapper.phys_to_mut(arena.pdpt(0)?) };
    *pdpt = PageDirectoryPointerTable::zeroed();
    for j in 0..KERNEL_NUM_PDS {
        pdpt.set(L3Index::new(j as u16), PdptEntry::make_next(arena.pd(j)?, flags));
    }

    // L4: the whole identity range hangs off slot 0.
    let root = arena.pml4(0)?;
    let pml4: &mut PageMapLevel4 = unsafe { mapper.phys_to_mut(root) };
    *pml4 = PageMapLevel4::zeroed();
    pml4.set(L4Index::new(0), Pml4Entry::make_next(arena.pdpt(0)?, flags));

    debug!("kernel identity tree built: {KERNEL_NUM_PTS} page tables, root {root}");
    Ok(KernelTables { pml4: root })
}

/// Build the user window tree.
///
/// Leaf layout in the window's single page table: the stack pages first
/// (slot 0 is the lowest stack page), then the binary pages contiguously,
/// the rest zeroed. With `map_demand_page` the reserved spare frame
/// additionally lands in the top slot; without it that slot stays
/// non-present so the first touch faults.
///
/// PML4 slot 0 receives a verbatim copy of the kernel root entry, which
/// keeps every kernel identity mapping visible once this root is active.
///
/// Returns the physical base of the user PML4, the value to load into CR3.
///
/// # Errors
/// [`BuildError::WindowOverflow`] if stack plus binary exceed the window's
/// leaf slots (all 512, or 511 when the top slot is claimed by
/// `map_demand_page`); [`BuildError::MisalignedBase`] for unaligned image
/// bases; [`BuildError::Arena`] if the arena was sized below
/// [`user_arena_shape`](crate::layout::user_arena_shape).
#[allow(clippy::cast_possible_truncation)]
pub fn build_user_tables<M: PhysMapper>(
    mapper: &M,
    arena: &TableArena,
    kernel: &KernelTables,
    image: &UserImage,
    map_demand_page: bool,
) -> Result<PhysicalAddress, BuildError> {
    for base in [image.stack_base, image.binary_base, image.demand_frame] {
        if !base.is_page_aligned() {
            return Err(BuildError::MisalignedBase {
                base: base.as_u64(),
            });
        }
    }

    let requested = image.stack_pages + image.binary_pages;
    let available = if map_demand_page {
        USER_WINDOW_SLOTS - 1
    } else {
        USER_WINDOW_SLOTS
    };
    if requested > available {
        return Err(BuildError::WindowOverflow {
            requested,
            available,
        });
    }

    let flags = PageEntryBits::new_user_rw();

    // L1: stack, then binary, then (optionally) the demand page on top.
    let pt: &mut PageTable = unsafe { mapper.phys_to_mut(arena.pt(0)?) };
    *pt = PageTable::zeroed();
    for k in 0..image.stack_pages {
        let frame = image.stack_base.add_pages(k as u64);
        pt.set(L1Index::new(k as u16), PtEntry::make_4k(frame, flags));
    }
    for k in 0..image.binary_pages {
        let frame = image.binary_base.add_pages(k as u64);
        pt.set(
            L1Index::new((image.stack_pages + k) as u16),
            PtEntry::make_4k(frame, flags),
        );
    }
    if map_demand_page {
        pt.set(
            L1Index::new(DEMAND_PAGE_SLOT as u16),
            PtEntry::make_4k(image.demand_frame, flags),
        );
    }

    // L2/L3: a single chain into the window slots.
    let pd: &mut PageDirectory = unsafe { mapper.phys_to_mut(arena.pd(0)?) };
    *pd = PageDirectory::zeroed();
    pd.set(
        L2Index::new(WINDOW_PD_SLOT as u16),
        PdEntry::make_next(arena.pt(0)?, flags),
    );

    let pdpt: &mut PageDirectoryPointerTable = unsafe { mapper.phys_to_mut(arena.pdpt(0)?) };
    *pdpt = PageDirectoryPointerTable::zeroed();
    pdpt.set(
        L3Index::new(WINDOW_PDPT_SLOT as u16),
        PdptEntry::make_next(arena.pd(0)?, flags),
    );

    // L4: kernel cross-link at slot 0, the window at slot 511.
    let link = {
        let kernel_pml4: &PageMapLevel4 = unsafe { mapper.phys_to_mut(kernel.pml4) };
        kernel_pml4.get(L4Index::new(KERNEL_LINK_PML4_SLOT as u16))
    };
    let root = arena.pml4(0)?;
    let pml4: &mut PageMapLevel4 = unsafe { mapper.phys_to_mut(root) };
    *pml4 = PageMapLevel4::zeroed();
    pml4.set(L4Index::new(KERNEL_LINK_PML4_SLOT as u16), link);
    pml4.set(
        L4Index::new(WINDOW_PML4_SLOT as u16),
        Pml4Entry::make_next(arena.pdpt(0)?, flags),
    );

    debug!(
        "user window tree built: {requested} leaf slots, demand page {}",
        if map_demand_page { "mapped" } else { "pending" }
    );
    Ok(root)
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod test {
    use super::*;
    use crate::addr::VirtualAddress;
    use crate::address_space::AddressSpace;
    use crate::layout;
    use crate::testing::TestPhys;
    use ringdrop_abi::window::{DEMAND_PAGE, USER_ENTRY, USER_WINDOW_BASE};

    const KERNEL_SCRATCH: u64 = 0x0100_0000;
    const USER_SCRATCH: u64 = 0x0200_0000;
    const STACK_PA: u64 = 0x0030_0000;
    const BINARY_PA: u64 = 0x0040_0000;
    const DEMAND_PA: u64 = 0x0050_0000;

    fn kernel_arena(phys: &TestPhys) -> TableArena {
        TableArena::new(
            PhysicalAddress::new(phys.base()),
            layout::KERNEL_TABLE_PAGES,
            layout::kernel_arena_shape(),
        )
        .unwrap()
    }

    fn user_arena(phys: &TestPhys) -> TableArena {
        TableArena::new(
            PhysicalAddress::new(phys.base()),
            layout::USER_TABLE_PAGES,
            layout::user_arena_shape(),
        )
        .unwrap()
    }

    /// A stand-in kernel root whose slot 0 carries a distinctive pattern,
    /// including bits outside the defined flag ranges.
    fn fake_kernel_root(phys: &TestPhys, at_page: usize) -> KernelTables {
        let pml4_pa = PhysicalAddress::new(phys.base() + (at_page as u64) * 4096);
        let pml4: &mut PageMapLevel4 = unsafe { phys.phys_to_mut(pml4_pa) };
        *pml4 = PageMapLevel4::zeroed();
        pml4.set(L4Index::new(0), Pml4Entry::from_bits(0x8000_0123_4555_5003));
        KernelTables { pml4: pml4_pa }
    }

    fn image(stack_pages: usize, binary_pages: usize) -> UserImage {
        UserImage {
            stack_base: PhysicalAddress::new(STACK_PA),
            stack_pages,
            binary_base: PhysicalAddress::new(BINARY_PA),
            binary_pages,
            demand_frame: PhysicalAddress::new(DEMAND_PA),
        }
    }

    #[test]
    fn kernel_identity_maps_every_frame() {
        let phys = TestPhys::new(KERNEL_SCRATCH, layout::KERNEL_TABLE_PAGES);
        let arena = kernel_arena(&phys);
        let tables = build_kernel_tables(&phys, &arena).unwrap();
        assert_eq!(tables.pml4, arena.pml4(0).unwrap());

        for t in 0..layout::KERNEL_NUM_PTS {
            let table: &PageTable = unsafe { phys.phys_to_mut(arena.pt(t).unwrap()) };
            for i in 0..ENTRIES_PER_TABLE {
                let e = table.get(L1Index::new(i as u16));
                assert!(e.is_present());
                assert!(e.flags().writable());
                assert!(!e.flags().user_access());
                assert_eq!(
                    e.frame().as_u64(),
                    ((t * ENTRIES_PER_TABLE + i) as u64) * 4096
                );
            }
        }
    }

    #[test]
    fn kernel_interior_levels_point_contiguously() {
        let phys = TestPhys::new(KERNEL_SCRATCH, layout::KERNEL_TABLE_PAGES);
        let arena = kernel_arena(&phys);
        build_kernel_tables(&phys, &arena).unwrap();

        for t in 0..layout::KERNEL_NUM_PDS {
            let pd: &PageDirectory = unsafe { phys.phys_to_mut(arena.pd(t).unwrap()) };
            for i in 0..ENTRIES_PER_TABLE {
                let j = t * ENTRIES_PER_TABLE + i;
                let e = pd.get(L2Index::new(i as u16));
                if j < layout::KERNEL_NUM_PTS {
                    assert_eq!(e.next_table(), arena.pt(j).unwrap());
                } else {
                    assert_eq!(e.into_bits(), 0);
                }
            }
        }

        let pdpt: &PageDirectoryPointerTable =
            unsafe { phys.phys_to_mut(arena.pdpt(0).unwrap()) };
        for j in 0..ENTRIES_PER_TABLE {
            let e = pdpt.get(L3Index::new(j as u16));
            if j < layout::KERNEL_NUM_PDS {
                assert_eq!(e.next_table(), arena.pd(j).unwrap());
            } else {
                assert_eq!(e.into_bits(), 0);
            }
        }

        let pml4: &PageMapLevel4 = unsafe { phys.phys_to_mut(arena.pml4(0).unwrap()) };
        assert_eq!(pml4.get(L4Index::new(0)).next_table(), arena.pdpt(0).unwrap());
        for j in 1u16..512 {
            assert_eq!(pml4.get(L4Index::new(j)).into_bits(), 0);
        }
    }

    #[test]
    fn kernel_walk_resolves_identity() {
        let phys = TestPhys::new(KERNEL_SCRATCH, layout::KERNEL_TABLE_PAGES);
        let arena = kernel_arena(&phys);
        let tables = build_kernel_tables(&phys, &arena).unwrap();
        let space = AddressSpace::from_root(&phys, tables.pml4);

        for va in [0u64, 0x1000, 0xB_8000, 0x1234_5000, (4u64 << 30) - 4096] {
            assert_eq!(
                space.translate(VirtualAddress::new(va)).unwrap().as_u64(),
                va
            );
        }
        // Page offsets pass through untouched.
        assert_eq!(
            space
                .translate(VirtualAddress::new(0xDEAD_B173))
                .unwrap()
                .as_u64(),
            0xDEAD_B173
        );
        // Nothing resolves past the identity ceiling.
        assert!(space.translate(VirtualAddress::new(4u64 << 30)).is_none());
    }

    #[test]
    fn kernel_mappings_visible_through_user_root() {
        let pages = layout::KERNEL_TABLE_PAGES + layout::USER_TABLE_PAGES;
        let phys = TestPhys::new(KERNEL_SCRATCH, pages);
        let karena = kernel_arena(&phys);
        let uarena = TableArena::new(
            PhysicalAddress::new(KERNEL_SCRATCH).add_pages(layout::KERNEL_TABLE_PAGES as u64),
            layout::USER_TABLE_PAGES,
            layout::user_arena_shape(),
        )
        .unwrap();

        let kernel = build_kernel_tables(&phys, &karena).unwrap();
        let root = build_user_tables(&phys, &uarena, &kernel, &image(1, 3), false).unwrap();

        let space = AddressSpace::from_root(&phys, root);
        // Kernel identity mappings resolve through the cross-link...
        assert_eq!(
            space
                .translate(VirtualAddress::new(0x0012_3000))
                .unwrap()
                .as_u64(),
            0x0012_3000
        );
        // ...and the window resolves through slot 511.
        assert_eq!(
            space
                .translate(VirtualAddress::new(USER_WINDOW_BASE))
                .unwrap()
                .as_u64(),
            STACK_PA
        );
    }

    #[test]
    fn kernel_root_entry_copied_verbatim() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);
        let root = build_user_tables(&phys, &arena, &kernel, &image(1, 3), false).unwrap();

        let kernel_pml4: &PageMapLevel4 = unsafe { phys.phys_to_mut(kernel.pml4) };
        let user_pml4: &PageMapLevel4 = unsafe { phys.phys_to_mut(root) };
        let link = user_pml4.get(L4Index::new(0)).into_bits();
        assert_eq!(link, kernel_pml4.get(L4Index::new(0)).into_bits());
        assert_ne!(link, 0);
    }

    #[test]
    fn scenario_one_stack_page_three_binary_pages() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);
        let root = build_user_tables(&phys, &arena, &kernel, &image(1, 3), false).unwrap();

        let pt: &PageTable = unsafe { phys.phys_to_mut(arena.pt(0).unwrap()) };
        assert_eq!(pt.get(L1Index::new(0)).frame().as_u64(), STACK_PA);
        for k in 0u16..3 {
            assert_eq!(
                pt.get(L1Index::new(1 + k)).frame().as_u64(),
                BINARY_PA + u64::from(k) * 4096
            );
        }
        for s in 4u16..512 {
            assert_eq!(pt.get(L1Index::new(s)).into_bits(), 0);
        }

        let space = AddressSpace::from_root(&phys, root);
        assert_eq!(
            space
                .translate(VirtualAddress::new(USER_WINDOW_BASE))
                .unwrap()
                .as_u64(),
            STACK_PA
        );
        assert_eq!(
            space
                .translate(VirtualAddress::new(USER_ENTRY))
                .unwrap()
                .as_u64(),
            BINARY_PA
        );
        assert_eq!(
            space
                .translate(VirtualAddress::new(USER_ENTRY + 2 * 4096))
                .unwrap()
                .as_u64(),
            BINARY_PA + 2 * 4096
        );
        assert!(space.translate(VirtualAddress::new(DEMAND_PAGE)).is_none());
    }

    #[test]
    fn demand_rebuild_maps_top_slot_only() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);

        let root = build_user_tables(&phys, &arena, &kernel, &image(1, 3), false).unwrap();
        let space = AddressSpace::from_root(&phys, root);
        assert!(space.translate(VirtualAddress::new(DEMAND_PAGE)).is_none());

        let root2 = build_user_tables(&phys, &arena, &kernel, &image(1, 3), true).unwrap();
        assert_eq!(root2, root, "the root must not move across rebuilds");

        let pt: &PageTable = unsafe { phys.phys_to_mut(arena.pt(0).unwrap()) };
        assert_eq!(pt.get(L1Index::new(511)).frame().as_u64(), DEMAND_PA);
        assert!(pt.get(L1Index::new(511)).flags().user_access());

        let space = AddressSpace::from_root(&phys, root2);
        assert_eq!(
            space
                .translate(VirtualAddress::new(DEMAND_PAGE))
                .unwrap()
                .as_u64(),
            DEMAND_PA
        );
        // Earlier mappings are unaffected.
        assert_eq!(
            space
                .translate(VirtualAddress::new(USER_WINDOW_BASE))
                .unwrap()
                .as_u64(),
            STACK_PA
        );
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);

        build_user_tables(&phys, &arena, &kernel, &image(1, 3), true).unwrap();
        let snapshot: Vec<[u8; 4096]> = (0..layout::USER_TABLE_PAGES)
            .map(|i| *phys.frame_bytes(i))
            .collect();

        build_user_tables(&phys, &arena, &kernel, &image(1, 3), true).unwrap();
        for (i, before) in snapshot.iter().enumerate() {
            assert_eq!(before, phys.frame_bytes(i), "table page {i} changed");
        }
    }

    #[test]
    fn window_boundary_512_fits_without_spill() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);
        build_user_tables(&phys, &arena, &kernel, &image(1, 511), false).unwrap();

        let pt: &PageTable = unsafe { phys.phys_to_mut(arena.pt(0).unwrap()) };
        assert_eq!(
            pt.get(L1Index::new(511)).frame().as_u64(),
            BINARY_PA + 510 * 4096
        );
        // The adjacent page directory holds only the window entry.
        let pd: &PageDirectory = unsafe { phys.phys_to_mut(arena.pd(0).unwrap()) };
        assert!(pd.get(L2Index::new(0)).is_present());
        for s in 1u16..512 {
            assert_eq!(pd.get(L2Index::new(s)).into_bits(), 0);
        }
    }

    #[test]
    fn window_boundary_513_rejected() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);
        assert_eq!(
            build_user_tables(&phys, &arena, &kernel, &image(1, 512), false).unwrap_err(),
            BuildError::WindowOverflow {
                requested: 513,
                available: 512
            }
        );
    }

    #[test]
    fn demand_slot_must_stay_free_when_claimed() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);
        assert_eq!(
            build_user_tables(&phys, &arena, &kernel, &image(1, 511), true).unwrap_err(),
            BuildError::WindowOverflow {
                requested: 512,
                available: 511
            }
        );
    }

    #[test]
    fn misaligned_image_rejected() {
        let phys = TestPhys::new(USER_SCRATCH, layout::USER_TABLE_PAGES + 1);
        let arena = user_arena(&phys);
        let kernel = fake_kernel_root(&phys, layout::USER_TABLE_PAGES);
        let mut img = image(1, 1);
        img.binary_base = PhysicalAddress::new(BINARY_PA + 0x200);
        assert_eq!(
            build_user_tables(&phys, &arena, &kernel, &img, false).unwrap_err(),
            BuildError::MisalignedBase {
                base: BINARY_PA + 0x200
            }
        );
    }
}
