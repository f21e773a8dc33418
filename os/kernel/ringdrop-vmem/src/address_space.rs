//! # Software page walk
//!
//! A read-only view over a built tree, used by tests to verify placement
//! and by the kernel to sanity-check a root before loading it. The walk
//! mirrors what the MMU does for 4 KiB translations; large-page leaves are
//! never produced by the builders, so the walk treats them as unmapped.

use crate::PhysMapper;
use crate::addr::{PhysicalAddress, VirtualAddress};
use crate::table::{
    PageDirectory, PageDirectoryPointerTable, PageMapLevel4, PageTable, split_indices,
};

/// A paging tree identified by its root, resolved through a [`PhysMapper`].
pub struct AddressSpace<'m, M> {
    root: PhysicalAddress,
    mapper: &'m M,
}

impl<'m, M> AddressSpace<'m, M>
where
    M: PhysMapper,
{
    /// View the tree rooted at `root`, typically a value produced by one of
    /// the builders.
    pub const fn from_root(mapper: &'m M, root: PhysicalAddress) -> Self {
        Self { root, mapper }
    }

    /// Physical base of the root table, the value loaded into CR3.
    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        self.root
    }

    /// Walk all four levels for `addr`. Returns the physical address it
    /// maps to, or `None` if any level is non-present.
    #[must_use]
    pub fn translate(&self, addr: VirtualAddress) -> Option<PhysicalAddress> {
        let (l4, l3, l2, l1) = split_indices(addr);

        let pml4: &PageMapLevel4 = unsafe { self.mapper.phys_to_mut(self.root) };
        let pml4e = pml4.get(l4);
        if !pml4e.is_present() {
            return None;
        }

        let pdpt: &PageDirectoryPointerTable =
            unsafe { self.mapper.phys_to_mut(pml4e.next_table()) };
        let pdpe = pdpt.get(l3);
        if !pdpe.is_present() || pdpe.flags().large_page() {
            return None;
        }

        let pd: &PageDirectory = unsafe { self.mapper.phys_to_mut(pdpe.next_table()) };
        let pde = pd.get(l2);
        if !pde.is_present() || pde.flags().large_page() {
            return None;
        }

        let pt: &PageTable = unsafe { self.mapper.phys_to_mut(pde.next_table()) };
        let pte = pt.get(l1);
        if !pte.is_present() {
            return None;
        }

        Some(PhysicalAddress::new(
            pte.frame().as_u64() + addr.page_offset(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entry::PageEntryBits;
    use crate::table::{L1Index, L2Index, L3Index, L4Index, PdEntry, PdptEntry, Pml4Entry, PtEntry};
    use crate::testing::TestPhys;

    const BASE: u64 = 0x0040_0000;

    /// One chain pml4 -> pdpt -> pd -> pt with a single leaf, at slot path
    /// (1, 2, 3, 4).
    fn chain(phys: &TestPhys, frame: PhysicalAddress) -> PhysicalAddress {
        let flags = PageEntryBits::new_common_rw();
        let pa = |page: u64| PhysicalAddress::new(BASE + page * 4096);

        let pt: &mut PageTable = unsafe { phys.phys_to_mut(pa(3)) };
        *pt = PageTable::zeroed();
        pt.set(L1Index::new(4), PtEntry::make_4k(frame, flags));

        let pd: &mut PageDirectory = unsafe { phys.phys_to_mut(pa(2)) };
        *pd = PageDirectory::zeroed();
        pd.set(L2Index::new(3), PdEntry::make_next(pa(3), flags));

        let pdpt: &mut PageDirectoryPointerTable = unsafe { phys.phys_to_mut(pa(1)) };
        *pdpt = PageDirectoryPointerTable::zeroed();
        pdpt.set(L3Index::new(2), PdptEntry::make_next(pa(2), flags));

        let pml4: &mut PageMapLevel4 = unsafe { phys.phys_to_mut(pa(0)) };
        *pml4 = PageMapLevel4::zeroed();
        pml4.set(L4Index::new(1), Pml4Entry::make_next(pa(1), flags));

        pa(0)
    }

    const fn va(l4: u64, l3: u64, l2: u64, l1: u64, offset: u64) -> u64 {
        (l4 << 39) | (l3 << 30) | (l2 << 21) | (l1 << 12) | offset
    }

    #[test]
    fn walk_resolves_the_mapped_leaf() {
        let phys = TestPhys::new(BASE, 4);
        let root = chain(&phys, PhysicalAddress::new(0x00AB_C000));
        let space = AddressSpace::from_root(&phys, root);
        assert_eq!(space.root(), root);

        let hit = space
            .translate(VirtualAddress::new(va(1, 2, 3, 4, 0x123)))
            .unwrap();
        assert_eq!(hit.as_u64(), 0x00AB_C123);
    }

    #[test]
    fn walk_stops_at_any_missing_level() {
        let phys = TestPhys::new(BASE, 4);
        let root = chain(&phys, PhysicalAddress::new(0x00AB_C000));
        let space = AddressSpace::from_root(&phys, root);

        // Neighbouring slots at each level are non-present.
        for bad in [
            va(0, 2, 3, 4, 0),
            va(1, 1, 3, 4, 0),
            va(1, 2, 2, 4, 0),
            va(1, 2, 3, 5, 0),
        ] {
            assert!(space.translate(VirtualAddress::new(bad)).is_none());
        }
    }
}
