#![cfg(test)]

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::utils::fs::{find_files, find_files_with_extensions};

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

#[test]
fn test_find_files_recurses_and_sorts() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("b.txt"));
    touch(&dir.path().join("a/deep/c.txt"));
    touch(&dir.path().join("a/d.log"));

    let found = find_files(dir.path(), &|p: &Path| p.extension().is_some_and(|e| e == "txt")).unwrap();

    assert_eq!(found, [dir.path().join("a/deep/c.txt"), dir.path().join("b.txt")]);
}

#[test]
fn test_find_files_accepts_a_single_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plugins.yaml");
    touch(&file);

    assert_eq!(find_files_with_extensions(&file, &["yaml"]).unwrap(), [file.clone()]);
    assert!(find_files_with_extensions(&file, &["toml"]).unwrap().is_empty());
}

#[test]
fn test_find_files_with_extensions_ignores_case() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("UPPER.YAML"));
    touch(&dir.path().join("lower.yml"));
    touch(&dir.path().join("noext"));

    let found = find_files_with_extensions(dir.path(), &["yaml", "YML"]).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_find_files_missing_directory_is_error() {
    let dir = tempdir().unwrap();
    let result = find_files_with_extensions(dir.path().join("missing"), &["yaml"]);
    assert!(result.is_err());
}
