//! Build script for Kinect capture
//!
//! Compiles the C++ libfreenect2 shim and links it with Rust when the
//! `freenect2` feature is enabled. Without it the crate is pure Rust.

fn main() {
    println!("cargo:rerun-if-changed=cpp/");

    if std::env::var_os("CARGO_FEATURE_FREENECT2").is_none() {
        return;
    }

    let mut build = cc::Build::new();

    build
        .cpp(true)
        .std("c++17")
        .include("cpp")
        .file("cpp/freenect_shim.cpp")
        .warnings(true)
        .extra_warnings(true);

    // CUDA pipeline is only available when libfreenect2 was built with it
    if std::env::var_os("KINECT_WITH_CUDA").is_some() {
        build.define("LIBFREENECT2_WITH_CUDA_SUPPORT", "1");
    }

    build.compile("kinect_shim");

    println!("cargo:rustc-link-lib=freenect2");
}
