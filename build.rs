use std::{env, fs, path::PathBuf};

// Puts the demo linker scripts where msp430-rt's link.x looks for them. Host builds skip this.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=demos/memory.x");
    println!("cargo:rerun-if-changed=demos/device.x");

    let target = env::var("TARGET").unwrap_or_default();
    if !target.starts_with("msp430") {
        return;
    }

    let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    for script in ["memory.x", "device.x"] {
        fs::copy(PathBuf::from("demos").join(script), out.join(script))
            .expect("demo linker script is missing");
    }
    println!("cargo:rustc-link-search={}", out.display());
}
