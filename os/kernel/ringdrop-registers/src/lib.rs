//! # Typed x86-64 registers
//!
//! Strongly-typed models of the control registers and MSRs the privileged
//! bootstrap touches, together with the instructions that move them. All
//! privileged register traffic funnels through this crate; the kernel's
//! only other assembly lives in its entry stubs.
//!
//! Register values themselves are plain bitfields and can be constructed
//! and inspected anywhere, including host tests. The `asm` feature gates
//! the actual `mov`/`rdmsr`/`wrmsr` accessors.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr2")]
pub mod cr2;

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "dtr")]
pub mod dtr;

#[cfg(feature = "efer")]
pub mod efer;

#[cfg(feature = "irq")]
pub mod irq;

#[cfg(feature = "msr")]
pub mod msr;

#[cfg(feature = "rflags")]
pub mod rflags;

#[cfg(feature = "segments")]
pub mod segments;

#[cfg(feature = "tr")]
pub mod tr;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety
    /// requirements. Most implementations execute a privileged instruction
    /// and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety
    /// requirements. Most implementations execute a privileged instruction
    /// and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}

pub trait LoadRegister {
    /// Loading this register is safe from any privilege level.
    fn load() -> Self;
}

pub trait StoreRegister {
    /// Storing this register is safe from any privilege level.
    fn store(self);
}

impl<T> LoadRegisterUnsafe for T
where
    T: LoadRegister,
{
    #[inline]
    unsafe fn load_unsafe() -> Self {
        <Self as LoadRegister>::load()
    }
}

impl<T> StoreRegisterUnsafe for T
where
    T: StoreRegister,
{
    #[inline]
    unsafe fn store_unsafe(self) {
        <Self as StoreRegister>::store(self);
    }
}
