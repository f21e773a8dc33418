//! SYSCALL/SYSRET entry path.
//!
//! `syscall` drops into the kernel with almost nothing done for us: RCX
//! and R11 hold the user RIP and RFLAGS, RSP still points at the user
//! stack, and no stack switch has happened. The stub parks the user RSP
//! in the thread-local block, switches to the kernel syscall stack,
//! materializes a [`SyscallFrame`], and hands it to Rust. FMASK clears IF
//! for the whole kernel leg, so the path never nests and one stack
//! suffices.

use crate::gdt;
use crate::syscall::syscall;
use crate::tls::{KERNEL_STACK_TOP_OFFSET, SAVED_USER_RSP_OFFSET};
use ringdrop_registers::efer::Efer;
use ringdrop_registers::msr::{Ia32Fmask, Ia32LStar, Ia32Star};
use ringdrop_registers::rflags::Rflags;
use ringdrop_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use ringdrop_vmem::VirtualAddress;

/// User register state captured by the entry stub.
///
/// Layout must match the push order in [`syscall_entry_stub`]. With
/// `#[repr(C)]`, memory from the top of the kernel stack reads:
///
///   +0  rax   (return value slot)
///   +8  rdi   (syscall number)
///   +16 rsi   (arg0)
///   +24 rdx   (arg1)
///   +32 r10   (arg2, standing in for the RCX `syscall` consumed)
///   +40 r8    (arg3)
///   +48 r9    (arg4)
///   +56 rip   (user RIP, from RCX)
///   +64 rflags (user RFLAGS, from R11)
///   +72 rsp   (user stack pointer)
#[derive(Debug)]
#[repr(C)]
pub struct SyscallFrame {
    pub rax: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub r10: u64,
    pub r8: u64,
    pub r9: u64,
    pub rip: u64,
    pub rflags: Rflags,
    pub rsp: u64,
}

/// Entry point named by `IA32_LSTAR`.
///
/// The user RSP crosses over through a `gs:` slot so no general register
/// is touched before the frame exists, and the return path points RSP
/// straight at the frame's saved value, clobbering nothing on the way
/// out.
///
/// Alignment: the kernel stack top is page-aligned and the frame is ten
/// qwords, so RSP sits at 0 mod 16 exactly where the ABI wants it before
/// `call`.
#[unsafe(naked)]
pub extern "C" fn syscall_entry_stub() {
    core::arch::naked_asm!(
        // RCX = user RIP, R11 = user RFLAGS, RSP = user stack.
        "mov qword ptr gs:[{usersp}], rsp",
        "mov rsp, qword ptr gs:[{kstack}]",
        // Build the SyscallFrame, last push at the lowest address.
        "push qword ptr gs:[{usersp}]", // +72: user RSP
        "push r11",                     // +64: user RFLAGS
        "push rcx",                     // +56: user RIP
        "push r9",                      // +48: arg4
        "push r8",                      // +40: arg3
        "push r10",                     // +32: arg2
        "push rdx",                     // +24: arg1
        "push rsi",                     // +16: arg0
        "push rdi",                     // +8 : sysno
        "push rax",                     // +0 : return value slot
        "cld",
        "mov rdi, rsp",
        "call {rust}",
        // Rust wrote the return value into the frame; everything else
        // goes back exactly as the user had it.
        "mov rax, [rsp + 0]",
        "mov rdi, [rsp + 8]",
        "mov rsi, [rsp + 16]",
        "mov rdx, [rsp + 24]",
        "mov r10, [rsp + 32]",
        "mov r8,  [rsp + 40]",
        "mov r9,  [rsp + 48]",
        "mov rcx, [rsp + 56]",
        "mov r11, [rsp + 64]",
        "mov rsp, [rsp + 72]",
        "sysretq",
        usersp = const SAVED_USER_RSP_OFFSET,
        kstack = const KERNEL_STACK_TOP_OFFSET,
        rust = sym syscall_rust,
    );
}

extern "sysv64" fn syscall_rust(tf: &mut SyscallFrame) {
    tf.rax = syscall(tf.rdi, tf.rsi, tf.rdx, tf.r10, tf.r8, tf.r9);
}

/// Program the SYSCALL/SYSRET machinery.
///
/// EFER.SCE turns the instructions on, STAR seeds the selector pairs,
/// LSTAR names the entry stub and FMASK clears IF on every entry.
///
/// # Safety
/// CPL0 only. The GDT from [`crate::gdt`] must be live (STAR encodes its
/// layout) and the TLS block initialized; a syscall taken before that
/// switches to a garbage stack.
pub unsafe fn init_syscall_msrs() {
    unsafe {
        Efer::load_unsafe().with_sce(true).store_unsafe();
        Ia32Star::new_64bit_raw(gdt::KERNEL_CS, gdt::USER_CS).store_unsafe();
        Ia32LStar::from(VirtualAddress::new(syscall_entry_stub as u64)).store_unsafe();
        Ia32Fmask::interrupts_off().store_unsafe();
    }
}
