//! Kernel bootstrap, from the loader's jump to the drop into ring 3.
//!
//! The loader calls [`_start`] exactly once, with boot services already
//! gone. From there the path is strictly forward: adopt the handed-over
//! stack, build both page-table trees, activate the user root, install
//! the privileged structures, enable interrupts, `iretq` into the user
//! program. Every step either succeeds or parks the CPU with a logged
//! reason; there is no path back.

use crate::context::{self, BootContext};
use crate::interrupts::Idt;
use crate::interrupts::default::DiagnosticGates;
use crate::interrupts::page_fault::{PageFaultInterrupt, page_fault_stub};
use crate::interrupts::spurious::{SpuriousInterrupt, spurious_stub};
use crate::interrupts::timer::{TimerInterrupt, timer_stub};
use crate::mem::IdentityMapper;
use crate::syscall::entry::init_syscall_msrs;
use crate::tss::{Tss64, init_tss};
use crate::{apic, gdt, idt, tls, userland};
use core::fmt::Display;
use core::sync::atomic::AtomicBool;
use log::{LevelFilter, error, info};
use ringdrop_handoff::HandoffRecord;
use ringdrop_qemu::QemuLogger;
use ringdrop_registers::cr3::Cr3;
use ringdrop_registers::{StoreRegisterUnsafe, irq};
use ringdrop_vmem::layout::{kernel_arena_shape, user_arena_shape};
use ringdrop_vmem::{
    PhysMapper, PhysicalAddress, TableArena, UserImage, VirtualAddress, build_kernel_tables,
    build_user_tables,
};

/// The kernel entry point.
///
/// # Loader interaction
/// The loader jumps here after `ExitBootServices`, with the image copied
/// flat to its link address. The linker script pins `.text.entry` to the
/// first byte of the image, so "jump to the load base" and "call
/// `_start`" are the same thing.
///
/// # ABI
/// [`KernelEntryFn`](ringdrop_handoff::KernelEntryFn): `sysv64`, with the
/// kernel stack top in `RDI`, the framebuffer base in `RSI`, pixel width
/// and height in `EDX`/`ECX`, and the handoff record in `R8`.
///
/// # Naked function & stack
/// The loader's stack is gone the moment boot services end, so this must
/// adopt the handed-over stack before any Rust frame exists. A naked
/// function keeps the compiler from emitting a prologue that would touch
/// the old stack.
#[unsafe(no_mangle)]
#[unsafe(naked)]
#[unsafe(link_section = ".text.entry")]
pub extern "sysv64" fn _start(
    _stack_top: *mut u8,
    _framebuffer: *mut u32,
    _width: u32,
    _height: u32,
    _handoff: *const HandoffRecord,
) -> ! {
    core::arch::naked_asm!(
        "cli",
        // Adopt the loader-allocated kernel stack, then shuffle the
        // remaining arguments down one register for kernel_entry
        // (fb, width, height, handoff).
        "mov rsp, rdi",
        "mov rdi, rsi",
        "mov esi, edx",
        "mov edx, ecx",
        "mov rcx, r8",
        // Emulate a CALL: align, push a dummy return address so RSP % 16
        // == 8 at entry, and terminate the frame chain.
        "and rsp, -16",
        "push 0",
        "xor rbp, rbp",
        "jmp {rust_entry}",
        rust_entry = sym kernel_entry,
    );
}

/// Kernel entry running on the handed-over stack.
///
/// This stack is reused as the syscall kernel stack later on; that is
/// sound because the bootstrap never returns to it after `iretq` and the
/// syscall path resets to the top on every entry.
extern "sysv64" fn kernel_entry(
    framebuffer: *mut u32,
    width: u32,
    height: u32,
    handoff: *const HandoffRecord,
) -> ! {
    let logger = QemuLogger::new(LevelFilter::Debug);
    logger.init().expect("logger init");

    info!("kernel reporting to QEMU, framebuffer {framebuffer:p} at {width}x{height}");

    let Some(handoff) = (unsafe { handoff.as_ref() }) else {
        error!("loader passed a null handoff record");
        irq::halt_forever();
    };
    // Copy the record off its boot-time page; the fault handler reads it
    // long after the loader's allocations stop being meaningful.
    let record = *handoff;

    let ctx = prepare(record);
    unsafe { activate(ctx) }
}

/// Log a fatal bootstrap error and park the CPU.
fn fail(stage: &str, err: &dyn Display) -> ! {
    error!("{stage} failed: {err}");
    irq::halt_forever()
}

/// Build both page-table trees from the handoff record and capture the
/// boot context the fault handlers will need.
///
/// Validation runs first: the same checks that guarantee the user tree
/// fits its window also guarantee the demand-fault rebuild cannot fail
/// later, so every malformed record is rejected here with a diagnostic
/// instead of surfacing as a triple fault halfway into user mode.
#[allow(clippy::cast_possible_truncation)]
fn prepare(record: HandoffRecord) -> &'static BootContext {
    if let Err(e) = record.validate() {
        fail("handoff validation", &e);
    }
    info!("handoff record validated");

    let kernel_arena = match TableArena::new(
        PhysicalAddress::new(record.kernel_tables.base),
        record.kernel_tables.pages as usize,
        kernel_arena_shape(),
    ) {
        Ok(arena) => arena,
        Err(e) => fail("kernel table arena", &e),
    };
    info!("building kernel identity tree ...");
    let kernel_tables = match build_kernel_tables(&IdentityMapper, &kernel_arena) {
        Ok(tables) => tables,
        Err(e) => fail("kernel tree build", &e),
    };

    let user_arena = match TableArena::new(
        PhysicalAddress::new(record.user_tables.base),
        record.user_tables.pages as usize,
        user_arena_shape(),
    ) {
        Ok(arena) => arena,
        Err(e) => fail("user table arena", &e),
    };
    let user_image = UserImage {
        stack_base: PhysicalAddress::new(record.user_stack.base()),
        stack_pages: record.user_stack.pages as usize,
        binary_base: PhysicalAddress::new(record.user_binary.base),
        binary_pages: record.user_binary.pages as usize,
        demand_frame: PhysicalAddress::new(record.demand_page),
    };
    info!("building user window tree ...");
    // The top leaf slot stays unmapped; the user program's first touch of
    // it exercises the demand-fault path.
    let user_pml4 = match build_user_tables(
        &IdentityMapper,
        &user_arena,
        &kernel_tables,
        &user_image,
        false,
    ) {
        Ok(root) => root,
        Err(e) => fail("user tree build", &e),
    };
    info!("user root at {user_pml4}");
    info!(
        "shared page at {shared:#x} carried through unmapped",
        shared = record.shared_page
    );

    unsafe {
        context::install(BootContext {
            handoff: record,
            kernel_tables,
            user_arena,
            user_image,
            user_pml4,
            demand_mapped: AtomicBool::new(false),
        })
    }
}

/// Install the privileged structures and drop to ring 3.
///
/// Ordering is load-bearing: the GDT must be live before the STAR layout
/// that encodes its selectors, the TSS before any ring crossing, and the
/// IDT fully populated before `sti`. The user root goes into CR3 first;
/// its cross-linked slot 0 keeps every kernel identity mapping visible,
/// so the rest of the bootstrap runs unchanged under the new tree.
///
/// # Safety
/// Must be called exactly once, after [`prepare`] installed the boot
/// context and with interrupts still disabled.
unsafe fn activate(ctx: &'static BootContext) -> ! {
    info!("activating user address space");
    unsafe { Cr3::from_pml4_phys(ctx.user_pml4).store_unsafe() };

    info!("installing GDT and TSS ...");
    let tss: &'static mut Tss64 = unsafe {
        IdentityMapper.phys_to_mut(PhysicalAddress::new(ctx.handoff.tss_segment.base))
    };
    init_tss(tss, VirtualAddress::new(ctx.handoff.tss_stack.top));
    unsafe { gdt::init_gdt_and_tss(tss) };

    info!("installing TLS block ...");
    unsafe { tls::init_tls(&ctx.handoff) };

    info!("wiring syscall entry ...");
    unsafe { init_syscall_msrs() };

    info!("installing IDT and enabling interrupts ...");
    let mut table = Idt::new();
    table
        .init_diagnostic_gates()
        .init_page_fault_gate(page_fault_stub)
        .init_timer_gate(timer_stub)
        .init_spurious_gate(spurious_stub);
    unsafe { idt::init_idt_once(table) };
    info!("interrupts enabled");

    info!("enabling local APIC timer ...");
    // Gates before the source: the timer starts counting the moment its
    // initial count lands, and its vector is already live.
    unsafe { apic::init_apic() };

    unsafe { userland::enter_user_mode() }
}
