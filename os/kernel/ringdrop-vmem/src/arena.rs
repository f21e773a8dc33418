//! # Table arena
//!
//! Deterministic placement of page tables inside a flat physical scratch
//! region. Placement is keyed by `(level, index)` so the "entry *j* points
//! at the *j*-th child table" invariant of the builders is arithmetic, not
//! an accident of pointer bumping:
//!
//! ```text
//! base ──► PT 0 │ PT 1 │ … │ PD 0 │ … │ PDPT 0 │ … │ PML4 0 │ …
//! ```
//!
//! Each level's tables are contiguous, lowest level first. The arena never
//! touches memory; it only computes addresses and enforces the region
//! budget.

use crate::addr::PhysicalAddress;

/// The four paging levels, used as arena keys.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TableLevel {
    /// Page Table (L1, leaf level).
    Pt,
    /// Page Directory (L2).
    Pd,
    /// Page Directory Pointer Table (L3).
    Pdpt,
    /// Page Map Level 4 (L4, root).
    Pml4,
}

/// How many tables of each level the arena holds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ArenaShape {
    pub num_pts: usize,
    pub num_pds: usize,
    pub num_pdpts: usize,
    pub num_pml4s: usize,
}

impl ArenaShape {
    /// Total pages the shape occupies (one page per table).
    #[inline]
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.num_pts + self.num_pds + self.num_pdpts + self.num_pml4s
    }

    const fn budget(&self, level: TableLevel) -> usize {
        match level {
            TableLevel::Pt => self.num_pts,
            TableLevel::Pd => self.num_pds,
            TableLevel::Pdpt => self.num_pdpts,
            TableLevel::Pml4 => self.num_pml4s,
        }
    }

    /// Page offset of the first table of `level` from the region base.
    const fn level_start(&self, level: TableLevel) -> usize {
        match level {
            TableLevel::Pt => 0,
            TableLevel::Pd => self.num_pts,
            TableLevel::Pdpt => self.num_pts + self.num_pds,
            TableLevel::Pml4 => self.num_pts + self.num_pds + self.num_pdpts,
        }
    }
}

/// Errors from arena construction and lookup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ArenaError {
    /// The scratch region cannot hold the requested shape.
    #[error("scratch region too small: need {needed} pages, have {have}")]
    RegionTooSmall { needed: usize, have: usize },
    /// The scratch region base is not 4 KiB aligned.
    #[error("scratch region base {base:#x} is not page-aligned")]
    MisalignedBase { base: u64 },
    /// A table index beyond the shape's budget for that level.
    #[error("{level:?} table index {index} out of budget {budget}")]
    IndexOutOfBudget {
        level: TableLevel,
        index: usize,
        budget: usize,
    },
}

/// A scratch region carved into per-level table slots.
#[derive(Debug, Copy, Clone)]
pub struct TableArena {
    base: PhysicalAddress,
    shape: ArenaShape,
}

impl TableArena {
    /// Lay `shape` out over the region at `base` spanning `region_pages`.
    ///
    /// # Errors
    /// [`ArenaError::MisalignedBase`] if `base` is not page-aligned;
    /// [`ArenaError::RegionTooSmall`] if the shape does not fit.
    pub const fn new(
        base: PhysicalAddress,
        region_pages: usize,
        shape: ArenaShape,
    ) -> Result<Self, ArenaError> {
        if !base.is_page_aligned() {
            return Err(ArenaError::MisalignedBase {
                base: base.as_u64(),
            });
        }
        let needed = shape.total_pages();
        if needed > region_pages {
            return Err(ArenaError::RegionTooSmall {
                needed,
                have: region_pages,
            });
        }
        Ok(Self { base, shape })
    }

    /// The shape the arena was built with.
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> ArenaShape {
        self.shape
    }

    /// Physical base of the `index`-th table of `level`.
    ///
    /// # Errors
    /// [`ArenaError::IndexOutOfBudget`] if `index` exceeds the shape's
    /// budget for that level.
    pub const fn table(&self, level: TableLevel, index: usize) -> Result<PhysicalAddress, ArenaError> {
        let budget = self.shape.budget(level);
        if index >= budget {
            return Err(ArenaError::IndexOutOfBudget {
                level,
                index,
                budget,
            });
        }
        let page = self.shape.level_start(level) + index;
        Ok(self.base.add_pages(page as u64))
    }

    /// Physical base of the `index`-th Page Table.
    ///
    /// # Errors
    /// See [`TableArena::table`].
    #[inline]
    pub const fn pt(&self, index: usize) -> Result<PhysicalAddress, ArenaError> {
        self.table(TableLevel::Pt, index)
    }

    /// Physical base of the `index`-th Page Directory.
    ///
    /// # Errors
    /// See [`TableArena::table`].
    #[inline]
    pub const fn pd(&self, index: usize) -> Result<PhysicalAddress, ArenaError> {
        self.table(TableLevel::Pd, index)
    }

    /// Physical base of the `index`-th PDPT.
    ///
    /// # Errors
    /// See [`TableArena::table`].
    #[inline]
    pub const fn pdpt(&self, index: usize) -> Result<PhysicalAddress, ArenaError> {
        self.table(TableLevel::Pdpt, index)
    }

    /// Physical base of the `index`-th PML4.
    ///
    /// # Errors
    /// See [`TableArena::table`].
    #[inline]
    pub const fn pml4(&self, index: usize) -> Result<PhysicalAddress, ArenaError> {
        self.table(TableLevel::Pml4, index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SHAPE: ArenaShape = ArenaShape {
        num_pts: 4,
        num_pds: 2,
        num_pdpts: 1,
        num_pml4s: 1,
    };

    #[test]
    fn levels_are_contiguous_lowest_first() {
        let base = PhysicalAddress::new(0x10_0000);
        let arena = TableArena::new(base, 8, SHAPE).unwrap();
        assert_eq!(arena.pt(0).unwrap().as_u64(), 0x10_0000);
        assert_eq!(arena.pt(3).unwrap().as_u64(), 0x10_3000);
        assert_eq!(arena.pd(0).unwrap().as_u64(), 0x10_4000);
        assert_eq!(arena.pd(1).unwrap().as_u64(), 0x10_5000);
        assert_eq!(arena.pdpt(0).unwrap().as_u64(), 0x10_6000);
        assert_eq!(arena.pml4(0).unwrap().as_u64(), 0x10_7000);
    }

    #[test]
    fn budget_is_enforced_per_level() {
        let arena = TableArena::new(PhysicalAddress::new(0), 8, SHAPE).unwrap();
        assert_eq!(
            arena.pt(4),
            Err(ArenaError::IndexOutOfBudget {
                level: TableLevel::Pt,
                index: 4,
                budget: 4
            })
        );
        assert_eq!(
            arena.pml4(1),
            Err(ArenaError::IndexOutOfBudget {
                level: TableLevel::Pml4,
                index: 1,
                budget: 1
            })
        );
    }

    #[test]
    fn region_must_fit_and_be_aligned() {
        assert_eq!(
            TableArena::new(PhysicalAddress::new(0), 7, SHAPE).unwrap_err(),
            ArenaError::RegionTooSmall { needed: 8, have: 7 }
        );
        assert_eq!(
            TableArena::new(PhysicalAddress::new(0x123), 8, SHAPE).unwrap_err(),
            ArenaError::MisalignedBase { base: 0x123 }
        );
    }
}
