use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use rustc_version::{version, version_meta, Channel};

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("constants.gen.rs");
    let mut f = File::create(dest_path).unwrap();

    writeln!(f, "/// The rustc version that was used to compile this crate").ok();
    match version() {
        Ok(version) => writeln!(
            f,
            "#[allow(dead_code)] pub const RUSTC_VERSION: Option<&str> = Some(\"{version}\");"
        ),
        Err(_) => writeln!(
            f,
            "#[allow(dead_code)] pub const RUSTC_VERSION: Option<&str> = None;"
        ),
    }
    .ok();

    writeln!(f, "/// The rustc release channel").ok();
    match version_meta() {
        Ok(meta) => {
            let chan = match meta.channel {
                Channel::Dev => "dev",
                Channel::Nightly => "nightly",
                Channel::Beta => "beta",
                Channel::Stable => "stable",
            };
            writeln!(
                f,
                "#[allow(dead_code)] pub const RUSTC_CHANNEL: Option<&str> = Some(\"{chan}\");"
            )
        }
        Err(_) => writeln!(
            f,
            "#[allow(dead_code)] pub const RUSTC_CHANNEL: Option<&str> = None;"
        ),
    }
    .ok();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
