//! Directory discovery: regular files only, no recursion.

use std::io;
use std::path::{Path, PathBuf};

/// List the regular files directly inside `dir`, sorted by path so runs
/// over the same directory are reported in a stable order.
pub fn regular_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
