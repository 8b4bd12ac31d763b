//! Build script - emits the ESP-IDF linker arguments for on-target builds.
//!
//! Host builds (the default feature set, used for `cargo test`) skip this
//! entirely so no ESP toolchain is required on the development machine.

fn main() {
    if std::env::var_os("CARGO_FEATURE_ESP32").is_some() {
        embuild::espidf::sysenv::output();
    }

    println!("cargo:rerun-if-changed=build.rs");
}
