//! Sorted directory listings for the fixed-depth corpus walk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Immediate subdirectories of `dir`, sorted by name. Plain files are skipped.
pub fn sorted_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-directory entry");
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Regular files directly inside `dir` as `(file name, path)`, sorted by name.
pub fn sorted_files(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push((name, path));
    }
    files.sort();
    Ok(files)
}

/// `path` relative to `root` with `/` separators; falls back to the full path.
pub fn relative_key(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path.display().to_string(),
    }
}
