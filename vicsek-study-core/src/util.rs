//! Contains a collection of useful utility functions.

use std::ffi::OsStr;
use std::fs::{read_dir, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Reads a file at the given path to a String.
pub fn read_text_file(path: &Path) -> std::io::Result<String> {
    debug!("{:?}", path);
    let mut fd = File::open(path)?;
    let mut content = String::new();
    fd.read_to_string(&mut content)?;

    Ok(content)
}

/// Get top level directories at the given path.
pub fn get_top_dirs_at(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    if dir.is_dir() {
        let dir_entry = match read_dir(dir) {
            Ok(d) => d,
            _ => {
                error!("couldn't read directory at path: {}", dir.to_string_lossy());
                return Vec::new();
            }
        };
        for entry in dir_entry {
            let path = match entry {
                Ok(p) => p.path(),
                _ => continue,
            };
            if path.is_dir() {
                paths.push(path);
            }
        }
    };
    paths.sort();
    paths
}

/// Get paths to files with the given extension in the provided directory,
/// sorted so that repeated scans are deterministic.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    if dir.is_dir() {
        let dir_entry = match read_dir(dir) {
            Ok(d) => d,
            _ => {
                error!("couldn't read directory at path: {}", dir.to_string_lossy());
                return Vec::new();
            }
        };
        for entry in dir_entry {
            let path = match entry {
                Ok(p) => p.path(),
                _ => continue,
            };
            if path.is_file() {
                let ext = path
                    .extension()
                    .unwrap_or(OsStr::new(""))
                    .to_str()
                    .unwrap_or("");
                if ext == extension {
                    paths.push(path);
                }
            }
        }
    };
    paths.sort();
    paths
}
