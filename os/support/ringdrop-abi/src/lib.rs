//! # Shared kernel/user contract
//!
//! Everything the kernel and the user program must agree on lives here:
//! the virtual layout of the user window ([`window`]), the syscall numbers
//! ([`syscall_abi`]) and, for userland builds, the syscall stubs themselves
//! ([`syscall`]).

#![no_std]
#![cfg_attr(not(feature = "syscall"), forbid(unsafe_code))]
#![cfg_attr(feature = "syscall", allow(unsafe_code))]

pub mod window;

#[cfg(feature = "syscall")]
pub mod syscall;

#[cfg(feature = "syscall-abi")]
pub mod syscall_abi;
