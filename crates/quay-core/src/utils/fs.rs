use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Find files recursively under `path` that match a predicate.
///
/// Entries are visited in file-name order so results are stable across
/// platforms. A missing `path` is an error; `path` may itself be a file.
pub fn find_files<P, F>(path: P, predicate: &F) -> io::Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool + ?Sized,
{
    let path = path.as_ref();
    let mut result = Vec::new();

    if path.is_file() {
        if predicate(path) {
            result.push(path.to_path_buf());
        }
        return Ok(result);
    }

    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for entry_path in entries {
        if entry_path.is_dir() {
            let mut sub_results = find_files(&entry_path, predicate)?;
            result.append(&mut sub_results);
        } else if predicate(&entry_path) {
            result.push(entry_path);
        }
    }

    Ok(result)
}

/// Find files whose extension is one of `extensions` (compared without the
/// leading dot, case-insensitively).
pub fn find_files_with_extensions<P: AsRef<Path>>(path: P, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let wanted: Vec<String> = extensions.iter().map(|ext| ext.to_lowercase()).collect();
    find_files(path, &move |p: &Path| match p.extension() {
        Some(ext) => wanted.contains(&ext.to_string_lossy().to_lowercase()),
        None => false,
    })
}
