//! Source-tree snapshot for run reproducibility.
//!
//! Copies `.rs` and `.toml` files from a source root into the run directory,
//! preserving the directory layout. Hidden entries and `target/` are skipped,
//! as is the destination itself when it lives under the root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Copy the source tree at `root` into `dest`. Returns the number of files
/// copied.
pub fn snapshot_sources(root: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let dest_canon = dest.canonicalize()?;
    copy_tree(root, dest, &dest_canon)
}

fn copy_tree(src: &Path, dest: &Path, dest_canon: &PathBuf) -> Result<usize> {
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || name_str == "target" {
            continue;
        }

        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if path.canonicalize().map(|p| &p == dest_canon).unwrap_or(false) {
                continue;
            }
            copied += copy_tree(&path, &dest.join(&name), dest_canon)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("rs") | Some("toml")
        ) {
            fs::create_dir_all(dest)?;
            fs::copy(&path, dest.join(&name))?;
            copied += 1;
        }
    }
    Ok(copied)
}
