//! # Kernel entry point
//!
//! A flat binary the loader copies to its link address and jumps into.
//! [`init`] owns the bootstrap; everything after `iretq` runs through the
//! gates in [`interrupts`] and the syscall entry in [`syscall`].

#![no_std]
#![no_main]
#![allow(unsafe_code)]

mod apic;
mod context;
mod gdt;
mod idt;
mod init;
mod interrupts;
mod mem;
mod privilege;
mod syscall;
mod tls;
mod tss;
mod userland;

use ringdrop_qemu::qemu_trace;
use ringdrop_registers::irq;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    qemu_trace!("kernel panic: {info}\n");
    irq::halt_forever()
}
