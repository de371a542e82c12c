/// Builds the gRPC client and server code for the `routeguide.proto`
/// definition using `tonic-prost-build`.
///
/// The generated module contains the `RouteGuide` service traits (client and
/// server) and the message types. A file descriptor set is written next to it
/// so the server can expose reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/routeguide.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// This function will `panic!` if code generation fails.
///
/// # Output
///
/// Generated code will be accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("routeguide");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("routeguide_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/routeguide.proto"], &["proto"])
        .unwrap();
}
