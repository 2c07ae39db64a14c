//! Build script to capture standard build metadata for `xbigen about`.

#[allow(dead_code)]
#[path = "src/standard/capture.rs"]
mod capture;

fn main() {
    println!("cargo:rerun-if-changed=src/standard/capture.rs");
    capture::export_env_vars();
}
