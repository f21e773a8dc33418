//! # Ring-3 user program
//!
//! A flat binary the kernel maps at the window entry address and enters
//! via `iretq`. It exercises the whole kernel surface available to it:
//! both syscalls, then a touch of the deliberately unmapped top window
//! page to take the kernel through the demand-fault path.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU64, Ordering};
use ringdrop_abi::syscall::{print_cstr, print_u64};
use ringdrop_abi::window::DEMAND_PAGE;

/// Lives in the image's zero-initialized tail; counting through it proves
/// the flat binary's data pages made it into the window mapping.
static STEPS: AtomicU64 = AtomicU64::new(0);

/// First byte of the image. The kernel enters with RSP at the entry
/// address itself, so alignment is established here before any Rust
/// frame exists.
#[unsafe(no_mangle)]
#[unsafe(naked)]
#[unsafe(link_section = ".text.entry")]
pub extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "and rsp, -16",
        "push 0",
        "xor rbp, rbp",
        "jmp {main}",
        main = sym user_main,
    )
}

extern "C" fn user_main() -> ! {
    let _ = print_cstr(c"ring 3 says hello\n");
    STEPS.fetch_add(1, Ordering::Relaxed);

    let _ = print_u64(STEPS.load(Ordering::Relaxed));
    STEPS.fetch_add(1, Ordering::Relaxed);

    // The top window page is unmapped until this very write faults it in.
    let probe = DEMAND_PAGE as *mut u64;
    let pattern = 0xC0FF_EE00_DEAD_F00D_u64;
    unsafe {
        core::ptr::write_volatile(probe, pattern);
        if core::ptr::read_volatile(probe) == pattern {
            let _ = print_cstr(c"demand page mapped and readable\n");
        } else {
            let _ = print_cstr(c"demand page readback mismatch\n");
        }
    }

    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    let _ = print_cstr(c"user panic\n");
    loop {
        core::hint::spin_loop();
    }
}
