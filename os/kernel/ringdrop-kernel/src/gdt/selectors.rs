//! Typed segment selectors.
//!
//! A selector is 16 bits however it is used, but CS, SS and TR each accept
//! only particular descriptor kinds. The marker-typed wrapper keeps a data
//! selector out of `ltr` and a TSS selector out of an `iretq` frame at
//! compile time, while `.encode()` hands the raw value to assembly:
//!
//! ```text
//!  15            3 2  1  0
//! +----------------+--+----+
//! |   Index[12:0]  |TI| RPL|
//! +----------------+--+----+  (TI=0 GDT, TI=1 LDT)
//! ```

#![allow(dead_code)]

use crate::privilege::Rpl;
use bitfield_struct::bitfield;

/// Which descriptor table a selector addresses. Only the GDT exists here;
/// the LDT variant completes the codec.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Table {
    Gdt = 0,
    Ldt = 1,
}

impl Table {
    pub const fn from_bits(bits: u8) -> Self {
        if bits == 0 { Self::Gdt } else { Self::Ldt }
    }

    pub const fn into_bits(self) -> u8 {
        self as u8
    }
}

/// Raw 16-bit selector encoding.
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct SegmentSelectorRaw {
    /// Requested privilege level.
    #[bits(2)]
    rpl: Rpl,
    /// Table indicator.
    #[bits(1)]
    ti: Table,
    /// Descriptor index into the table.
    #[bits(13)]
    index: u16,
}

impl SegmentSelectorRaw {
    /// Assemble a raw selector; no semantic checks.
    pub const fn new_with(index: u16, table: Table, rpl: Rpl) -> Self {
        Self::new().with_index(index).with_ti(table).with_rpl(rpl)
    }
}

/// Marker trait for selector kinds.
pub trait SelectorKind: Copy {}

/// Code segment (CS) selector.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum CodeSel {}

/// Data/stack (DS/ES/SS) selector.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum DataSel {}

/// TSS system segment selector, for `ltr`.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum TssSel {}

impl SelectorKind for CodeSel {}
impl SelectorKind for DataSel {}
impl SelectorKind for TssSel {}

/// A selector tagged with the descriptor kind it may name.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct SegmentSelector<K: SelectorKind>(SegmentSelectorRaw, core::marker::PhantomData<K>);

impl<K: SelectorKind> SegmentSelector<K> {
    /// The plain `u16`, for descriptor-table instructions and stack frames.
    #[inline]
    #[must_use]
    pub const fn encode(self) -> u16 {
        self.0.into_bits()
    }
}

impl SegmentSelector<CodeSel> {
    /// A code selector for a GDT index. User code wants [`Rpl::Ring3`],
    /// which bakes the `|3` into the encoded value.
    #[must_use]
    pub const fn new(index: u16, rpl: Rpl) -> Self {
        Self(
            SegmentSelectorRaw::new_with(index, Table::Gdt, rpl),
            core::marker::PhantomData,
        )
    }
}

impl SegmentSelector<DataSel> {
    /// A data/stack selector for a GDT index. For a ring-3 SS the RPL must
    /// match the CPL being entered.
    #[must_use]
    pub const fn new(index: u16, rpl: Rpl) -> Self {
        Self(
            SegmentSelectorRaw::new_with(index, Table::Gdt, rpl),
            core::marker::PhantomData,
        )
    }
}

impl SegmentSelector<TssSel> {
    /// A TSS selector for `ltr`; the RPL field is architecturally ignored.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(
            SegmentSelectorRaw::new_with(index, Table::Gdt, Rpl::Ring0),
            core::marker::PhantomData,
        )
    }
}
