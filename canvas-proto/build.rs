use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use prost::Message;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=proto/text2image.proto");

    // protox compiles the schema in-process, so no system protoc is needed
    let descriptors = protox::compile(["text2image.proto"], ["proto"])
        .context("failed to compile proto/text2image.proto")?;
    let descriptor_path =
        PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR not set")?).join("text2image.bin");
    fs::write(&descriptor_path, descriptors.encode_to_vec())?;

    tonic_build::configure()
        .file_descriptor_set_path(&descriptor_path)
        .skip_protoc_run()
        .compile_protos(&["text2image.proto"], &["proto"])?;
    Ok(())
}
