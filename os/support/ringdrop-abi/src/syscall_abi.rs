//! # Syscall numbers and register convention
//!
//! The `syscall` instruction carries the call number in `RDI` and up to five
//! arguments in `RSI`, `RDX`, `R10`, `R8`, `R9` (`R10` stands in for `RCX`,
//! which the instruction overwrites with the return `RIP`). The result comes
//! back in `RAX`: `0` on success, `u64::MAX` for an unrecognized number.

#[repr(u64)]
pub enum Sysno {
    /// Print a NUL-terminated byte string. Argument 0 is the string's
    /// virtual address in the caller's address space.
    PrintString = 0,
    /// Print an unsigned integer in decimal. Argument 0 is the value.
    PrintInteger = 1,
}
