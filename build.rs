use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Embed the Windows manifest that requests administrator privileges
    println!("cargo:rerun-if-changed=shopwatch.rc");
    println!("cargo:rerun-if-changed=shopwatch.manifest");
    let _ = embed_resource::compile("shopwatch.rc", embed_resource::NONE);

    copy_config();
}

/// Target profile directory (target/release or target/debug).
fn target_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    // OUT_DIR is target/<profile>/build/shopwatch-xxx/out
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}

/// Copies config.json next to the executable unless one is already there.
fn copy_config() {
    let config_src = Path::new("config.json");
    println!("cargo:rerun-if-changed=config.json");
    let Some(target_dir) = target_dir() else {
        return;
    };
    let config_dst = target_dir.join("config.json");

    // Keep the operator's captured anchors across rebuilds
    if config_src.exists() && !config_dst.exists() {
        let _ = fs::copy(config_src, &config_dst);
    }
}
