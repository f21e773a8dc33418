use std::{env, path::PathBuf};

fn main() {
    // Point to the linker script
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let ld = manifest_dir.join("user.ld");

    // Fail fast if the entry-address contract drifts
    let entry = ringdrop_abi::window::USER_ENTRY;
    assert_eq!(
        entry & 0xfff,
        0,
        "USER_ENTRY must be 4 KiB aligned (got {entry:#x})"
    );

    // Rebuild when inputs change
    println!("cargo:rerun-if-changed={}", ld.display());

    // Linker script
    println!("cargo:rustc-link-arg-bins=-T{}", ld.display());

    // Provide the entry address to the linker script
    println!("cargo:rustc-link-arg-bins=--defsym=USER_ENTRY={entry:#x}");
}
