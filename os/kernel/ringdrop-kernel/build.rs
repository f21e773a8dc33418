use std::{env, path::PathBuf};

fn main() {
    // Point to the linker script
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let ld = manifest_dir.join("kernel.ld");

    // Fail fast if the load-address contract drifts
    let load_base = ringdrop_handoff::KERNEL_LOAD_BASE;
    assert_eq!(
        load_base & 0xfff,
        0,
        "KERNEL_LOAD_BASE must be 4 KiB aligned (got {load_base:#x})"
    );

    // Rebuild when inputs change
    println!("cargo:rerun-if-changed={}", ld.display());

    // Linker script
    println!("cargo:rustc-link-arg-bins=-T{}", ld.display());

    // Provide the load base to the linker script
    println!("cargo:rustc-link-arg-bins=--defsym=KERNEL_LOAD_BASE={load_base:#x}");
}
