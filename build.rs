// build.rs
//
// Stamps the build time into OUT_DIR/build_info.rs for the version banner.

use chrono::Utc;
use std::{env, fs, io, path::Path};

fn main() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
    let dest_path = Path::new(&out_dir).join("build_info.rs");

    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    fs::write(
        &dest_path,
        format!("pub const BUILD_DATE: &str = \"{}\";\n", build_date),
    )?;

    // only rebuild the stamp when this script changes
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
