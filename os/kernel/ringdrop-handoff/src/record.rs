use ringdrop_abi::window::{PAGE_SIZE, USER_WINDOW_SLOTS};

/// Physical address the kernel image is linked at and must be loaded to.
///
/// The kernel is a flat binary with absolute relocations baked in, so the
/// loader allocates its pages at exactly this address instead of taking
/// whatever the firmware offers. 1 MiB sits above the legacy/firmware
/// ranges and inside both the identity tree and UEFI's own mapping.
pub const KERNEL_LOAD_BASE: u64 = 0x0010_0000;

/// Kernel entry-point signature.
///
/// # ABI
/// Pinned to `sysv64` on both sides of the jump: the loader is a PE/COFF
/// binary whose default C ABI is `win64`, so relying on `extern "C"` here
/// would silently disagree about argument registers.
///
/// Arguments, in order: the kernel stack top, the framebuffer base, pixel
/// width, pixel height, and the handoff record.
pub type KernelEntryFn =
    extern "sysv64" fn(*mut u8, *mut u32, u32, u32, *const HandoffRecord) -> !;

/// A page-aligned physical region, identified by its lowest page.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Region {
    /// Physical base address, 4 KiB aligned.
    pub base: u64,
    /// Extent in 4 KiB pages.
    pub pages: u64,
}

impl Region {
    /// Physical address of the first byte past the region.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base + self.pages * PAGE_SIZE
    }
}

/// A stack allocation, identified by its *top*: the initial stack-pointer
/// value, one byte past the highest usable address.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StackRegion {
    /// Physical top of the stack, 4 KiB aligned.
    pub top: u64,
    /// Extent in 4 KiB pages, growing downward from `top`.
    pub pages: u64,
}

impl StackRegion {
    /// Physical address of the lowest stack page.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.top - self.pages * PAGE_SIZE
    }
}

/// Populated slot counts for the user tree, one per paging level.
///
/// The window is a single chain (one PT, one PD, one PDPT, one PML4), so
/// everything but `ptes` is 1 by construction; the counts travel in the
/// record anyway so the kernel can reject a loader it disagrees with
/// instead of building a silently wrong tree.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UserTableCounts {
    /// Populated leaf slots: user stack pages plus user binary pages.
    pub ptes: u64,
    /// Populated PD slots.
    pub pdes: u64,
    /// Populated PDPT slots.
    pub pdpes: u64,
    /// Populated PML4 slots beyond the kernel cross-link.
    pub pml4es: u64,
}

/// Everything the kernel needs from the loader, in one `#[repr(C)]` block.
///
/// Lifecycle: written once by the loader immediately before the one-way
/// jump, copied into kernel-global state at entry, read-only afterwards.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HandoffRecord {
    /// Ring-0 stack the kernel entry switches to.
    pub kernel_stack: StackRegion,
    /// Ring-0 stack taken on interrupts arriving from ring 3 (TSS `rsp0`).
    pub tss_stack: StackRegion,
    /// The user program's stack, mapped at the bottom of the user window.
    pub user_stack: StackRegion,
    /// Scratch region for the kernel identity tree.
    pub kernel_tables: Region,
    /// Scratch region for the user window tree.
    pub user_tables: Region,
    /// The user program image, loaded verbatim from the boot volume.
    pub user_binary: Region,
    /// One page backing the task-state segment.
    pub tss_segment: Region,
    /// One page backing the per-CPU thread-local block.
    pub tls: Region,
    /// The spare physical page mapped on the first demand fault.
    pub demand_page: u64,
    /// A page reserved for kernel/user data exchange; carried through the
    /// handoff but not mapped anywhere by the bootstrap.
    pub shared_page: u64,
    /// User-tree slot counts, cross-checked against the regions above.
    pub user_counts: UserTableCounts,
}

/// Ways a handoff record can be internally inconsistent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum HandoffError {
    #[error("{field} is not page-aligned: {addr:#x}")]
    Misaligned { field: &'static str, addr: u64 },
    #[error("{field} must span at least one page")]
    Empty { field: &'static str },
    #[error("user stack must be exactly one page, got {pages}")]
    UserStackSize { pages: u64 },
    #[error("user leaf count {ptes} does not match stack {stack} + binary {binary} pages")]
    LeafCountMismatch { ptes: u64, stack: u64, binary: u64 },
    #[error("user window holds at most {limit} leaf slots next to the demand page, got {ptes}")]
    WindowTooSmall { ptes: u64, limit: u64 },
    #[error("user tree must be a single chain; pdes/pdpes/pml4es all 1")]
    NotSingleChain,
}

impl HandoffRecord {
    /// Check the record's internal invariants.
    ///
    /// # Errors
    /// The first violated invariant, checked in field order.
    pub fn validate(&self) -> Result<(), HandoffError> {
        let regions = [
            ("kernel_stack", self.kernel_stack.top, self.kernel_stack.pages),
            ("tss_stack", self.tss_stack.top, self.tss_stack.pages),
            ("user_stack", self.user_stack.top, self.user_stack.pages),
            ("kernel_tables", self.kernel_tables.base, self.kernel_tables.pages),
            ("user_tables", self.user_tables.base, self.user_tables.pages),
            ("user_binary", self.user_binary.base, self.user_binary.pages),
            ("tss_segment", self.tss_segment.base, self.tss_segment.pages),
            ("tls", self.tls.base, self.tls.pages),
            ("demand_page", self.demand_page, 1),
            ("shared_page", self.shared_page, 1),
        ];
        for (field, addr, pages) in regions {
            if addr % PAGE_SIZE != 0 {
                return Err(HandoffError::Misaligned { field, addr });
            }
            if pages == 0 {
                return Err(HandoffError::Empty { field });
            }
        }

        if self.user_stack.pages != 1 {
            return Err(HandoffError::UserStackSize {
                pages: self.user_stack.pages,
            });
        }

        let counts = self.user_counts;
        if counts.ptes != self.user_stack.pages + self.user_binary.pages {
            return Err(HandoffError::LeafCountMismatch {
                ptes: counts.ptes,
                stack: self.user_stack.pages,
                binary: self.user_binary.pages,
            });
        }
        // The top leaf slot stays free for the demand page.
        let limit = (USER_WINDOW_SLOTS - 1) as u64;
        if counts.ptes > limit {
            return Err(HandoffError::WindowTooSmall {
                ptes: counts.ptes,
                limit,
            });
        }
        if counts.pdes != 1 || counts.pdpes != 1 || counts.pml4es != 1 {
            return Err(HandoffError::NotSingleChain);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> HandoffRecord {
        HandoffRecord {
            kernel_stack: StackRegion {
                top: 0x0040_0000,
                pages: 16,
            },
            tss_stack: StackRegion {
                top: 0x0041_0000,
                pages: 8,
            },
            user_stack: StackRegion {
                top: 0x0042_0000,
                pages: 1,
            },
            kernel_tables: Region {
                base: 0x0100_0000,
                pages: 2054,
            },
            user_tables: Region {
                base: 0x0200_0000,
                pages: 4,
            },
            user_binary: Region {
                base: 0x0300_0000,
                pages: 3,
            },
            tss_segment: Region {
                base: 0x0301_0000,
                pages: 1,
            },
            tls: Region {
                base: 0x0302_0000,
                pages: 1,
            },
            demand_page: 0x0303_0000,
            shared_page: 0x0304_0000,
            user_counts: UserTableCounts {
                ptes: 4,
                pdes: 1,
                pdpes: 1,
                pml4es: 1,
            },
        }
    }

    #[test]
    fn sample_record_is_valid() {
        sample().validate().unwrap();
    }

    #[test]
    fn record_layout_is_stable() {
        // The loader and kernel are separate binaries; this locks the ABI.
        assert_eq!(size_of::<HandoffRecord>(), 176);
        assert_eq!(align_of::<HandoffRecord>(), 8);
        assert_eq!(size_of::<Region>(), 16);
        assert_eq!(size_of::<StackRegion>(), 16);
        assert_eq!(size_of::<UserTableCounts>(), 32);
    }

    #[test]
    fn stack_base_derives_from_top() {
        let stack = StackRegion {
            top: 0x0040_0000,
            pages: 16,
        };
        assert_eq!(stack.base(), 0x0040_0000 - 16 * 4096);
    }

    #[test]
    fn misaligned_field_is_named() {
        let mut record = sample();
        record.demand_page += 0x10;
        assert_eq!(
            record.validate().unwrap_err(),
            HandoffError::Misaligned {
                field: "demand_page",
                addr: 0x0303_0010
            }
        );
    }

    #[test]
    fn empty_region_rejected() {
        let mut record = sample();
        record.user_binary.pages = 0;
        // The leaf count check is downstream; emptiness is caught first.
        assert_eq!(
            record.validate().unwrap_err(),
            HandoffError::Empty {
                field: "user_binary"
            }
        );
    }

    #[test]
    fn user_stack_must_be_one_page() {
        let mut record = sample();
        record.user_stack.pages = 2;
        record.user_counts.ptes = 5;
        assert_eq!(
            record.validate().unwrap_err(),
            HandoffError::UserStackSize { pages: 2 }
        );
    }

    #[test]
    fn leaf_count_must_match_regions() {
        let mut record = sample();
        record.user_counts.ptes = 7;
        assert_eq!(
            record.validate().unwrap_err(),
            HandoffError::LeafCountMismatch {
                ptes: 7,
                stack: 1,
                binary: 3
            }
        );
    }

    #[test]
    fn window_limit_reserves_demand_slot() {
        let mut record = sample();
        record.user_binary.pages = 511;
        record.user_counts.ptes = 512;
        assert_eq!(
            record.validate().unwrap_err(),
            HandoffError::WindowTooSmall {
                ptes: 512,
                limit: 511
            }
        );
    }

    #[test]
    fn single_chain_counts_enforced() {
        let mut record = sample();
        record.user_counts.pdes = 2;
        assert_eq!(record.validate().unwrap_err(), HandoffError::NotSingleChain);
    }
}
