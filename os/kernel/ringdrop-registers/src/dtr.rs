//! Descriptor-table pointers and the `lgdt`/`lidt` instructions.

/// The 10-byte memory operand of `lgdt` and `lidt`: a 16-bit limit
/// followed by the 64-bit linear base of the table.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone)]
pub struct DescriptorTablePointer {
    /// Size of the table in bytes, minus one.
    pub limit: u16,
    /// Linear base address of the table.
    pub base: u64,
}

impl DescriptorTablePointer {
    /// A pointer covering the whole of `table`.
    ///
    /// The `'static` bound keeps the descriptor table alive for as long as
    /// the CPU may walk it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_table<T>(table: &'static T) -> Self {
        debug_assert!(size_of::<T>() <= 0x1_0000, "descriptor table too large");
        Self {
            limit: (size_of::<T>() - 1) as u16,
            base: core::ptr::from_ref(table) as u64,
        }
    }

    /// Load this pointer into GDTR.
    ///
    /// # Safety
    /// CPL0 only. The table must be a valid GDT; segment registers still
    /// hold selectors into the old table until reloaded.
    #[cfg(feature = "asm")]
    pub unsafe fn load_gdt(&self) {
        unsafe {
            core::arch::asm!("lgdt [{}]", in(reg) self, options(readonly, nostack, preserves_flags));
        }
    }

    /// Load this pointer into IDTR and set the interrupt flag.
    ///
    /// One instruction sequence with no gap: there is no state in which
    /// interrupts are enabled but the table is not the one named here.
    ///
    /// # Safety
    /// CPL0 only. Every present gate must point at a valid handler, and
    /// the table must remain a valid IDT while interrupts can be
    /// delivered; delivery may start the instruction after this returns.
    #[cfg(feature = "asm")]
    pub unsafe fn load_idt_enable_interrupts(&self) {
        unsafe {
            core::arch::asm!("lidt [{}]", "sti", in(reg) self, options(readonly, nostack));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pointer_layout_is_packed() {
        assert_eq!(size_of::<DescriptorTablePointer>(), 10);
    }

    #[test]
    fn limit_is_size_minus_one() {
        static TABLE: [u64; 7] = [0; 7];
        let ptr = DescriptorTablePointer::for_table(&TABLE);
        // Copy out of the packed struct before asserting; references into
        // it would be unaligned.
        let limit = ptr.limit;
        let base = ptr.base;
        assert_eq!(limit, 7 * 8 - 1);
        assert_eq!(base, TABLE.as_ptr() as u64);
    }
}
