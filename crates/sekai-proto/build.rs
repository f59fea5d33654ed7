//! Build script for sekai-proto
//!
//! Compiles protobuf definitions using tonic-prost-build.

use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = Path::new("../../proto");

    let protos = ["sekai/v1/identity.proto", "sekai/v1/player.proto"];

    let proto_paths: Vec<PathBuf> = protos.iter().map(|p| proto_root.join(p)).collect();

    for path in &proto_paths {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&proto_paths, &[proto_root.to_path_buf()])?;

    Ok(())
}
