//! Build script for the Triton protocol bindings
//!
//! Generates both client and server stubs; the server side backs the
//! in-process test fixtures.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/");

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/grpc_service.proto"], &["proto"])?;

    Ok(())
}
