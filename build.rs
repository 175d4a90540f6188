// Build script for flutter_rust_bridge integration
//
// Dart bindings are generated out of band:
//   flutter_rust_bridge_codegen generate
//
// This script only tracks the FFI surface and fixes up Android linking.

fn main() {
    // Tell cargo to rerun this build script if the FFI surface changes
    println!("cargo:rerun-if-changed=src/api.rs");

    // Oboe is C++; Android builds must link libc++_shared so symbols like
    // __cxa_pure_virtual resolve on all ABIs (arm/x86).
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("android") {
        println!("cargo:rustc-link-lib=c++_shared");
    }
}
