#![cfg(test)]

//! Loading plugins out of real shared libraries. The libraries under
//! `tests/test_plugins` are built on demand into a temporary target
//! directory, once per test binary.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tempfile::{tempdir, TempDir};

use crate::context::Context;
use crate::error::ErrorKind;
use crate::library::library_filename;
use crate::plugin::LoadState;

struct BuiltPlugin {
    path: PathBuf,
    // Keeps the build output alive for the whole test run.
    _target_dir: TempDir,
}

fn cargo_build(project: &Path, target_dir: &Path, offline: bool) -> Result<(), String> {
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let mut cmd = Command::new(cargo);
    cmd.current_dir(project).arg("build").arg("--target-dir").arg(target_dir);
    if offline {
        cmd.arg("--offline");
    }
    let output = cmd
        .output()
        .map_err(|e| format!("Failed to execute cargo build in {}: {}", project.display(), e))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "cargo build in {} exited with {:?}.\nStderr:\n{}",
            project.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}

// Returns the path to the compiled library named `lib_name` in the crate at
// `tests/test_plugins/<project>`.
fn compile_test_plugin(project: &str, lib_name: &str) -> Result<BuiltPlugin, String> {
    let project_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/test_plugins")
        .join(project);
    let target_dir = tempdir().map_err(|e| format!("Failed to create temp dir for compilation: {}", e))?;

    if let Err(online) = cargo_build(&project_path, target_dir.path(), false) {
        cargo_build(&project_path, target_dir.path(), true)
            .map_err(|offline| format!("{}\n\nRetry with --offline: {}", online, offline))?;
    }

    let path = target_dir.path().join("debug").join(library_filename(lib_name));
    if !path.exists() {
        return Err(format!("Compiled plugin library not found at {}", path.display()));
    }
    Ok(BuiltPlugin { path, _target_dir: target_dir })
}

fn greek() -> &'static Path {
    static GREEK: OnceLock<Result<BuiltPlugin, String>> = OnceLock::new();
    match GREEK.get_or_init(|| compile_test_plugin("greek", "quay_greek")) {
        Ok(built) => &built.path,
        Err(e) => panic!("Failed to compile greek test plugins: {}", e),
    }
}

fn bad_records() -> &'static Path {
    static BAD_RECORDS: OnceLock<Result<BuiltPlugin, String>> = OnceLock::new();
    match BAD_RECORDS.get_or_init(|| compile_test_plugin("bad_records", "quay_bad_records")) {
        Ok(built) => &built.path,
        Err(e) => panic!("Failed to compile bad_records test plugins: {}", e),
    }
}

fn context_with(library: &Path, names: &[&str]) -> Context {
    let library = library.to_str().expect("temp paths are valid UTF-8");
    let mut ctx = Context::new();
    for name in names {
        ctx.add_dynamic_plugin(name, Some(library)).unwrap();
    }
    ctx
}

fn letters(ctx: &Context) -> Vec<(String, u32)> {
    let letters = ctx.require_extension_point("letters").unwrap();
    ctx.extension_point(letters)
        .iter()
        .map(|e| (e.name().to_string(), *e.payload::<u32>().unwrap()))
        .collect()
}

#[test]
fn test_load_plugin_from_library() {
    let mut ctx = context_with(greek(), &["alpha"]);

    ctx.load_plugins().unwrap();

    let alpha = ctx.get_plugin("alpha").unwrap();
    assert!(alpha.is_loaded());
    assert!(alpha.is_resolved());
    assert_eq!(letters(&ctx), [("alpha".to_string(), 1)]);
}

#[test]
fn test_library_dependencies_by_name_and_by_record() {
    let mut ctx = context_with(greek(), &["alpha", "beta", "gamma"]);

    ctx.require_plugin("gamma").unwrap();

    for name in ["alpha", "beta", "gamma"] {
        assert_eq!(ctx.get_plugin(name).unwrap().state(), LoadState::Loaded);
    }
    let names: Vec<String> = letters(&ctx).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["alpha", "beta", "gamma"]);
    assert_eq!(ctx.plugin_count(), 3);
}

#[test]
fn test_record_of_resolved_dynamic_plugin_is_not_redefined() {
    let mut ctx = context_with(greek(), &["alpha", "beta", "gamma"]);

    // beta resolves through the library before gamma asks for its record.
    ctx.load_plugins().unwrap();

    assert!(ctx.plugins().all(|p| p.is_loaded()));
    assert_eq!(ctx.plugin_count(), 3);
}

#[test]
fn test_library_cycle_is_circular_dependency() {
    let mut ctx = context_with(greek(), &["alpha", "circular"]);

    let err = ctx.require_plugin("circular").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CircularDependency);
    assert_ne!(ctx.get_plugin("circular").unwrap().state(), LoadState::Loaded);
    assert_eq!(ctx.get_plugin("gamma").unwrap().state(), LoadState::Loaded);
}

#[test]
fn test_dependency_missing_from_context_is_undefined() {
    let mut ctx = context_with(greek(), &["beta"]);

    let err = ctx.require_plugin("beta").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Undefined);
    assert_eq!(err.to_string(), "Undefined: No plugin named \"alpha\"");
}

#[test]
fn test_registration_for_other_plugin_is_bad_library() {
    let mut ctx = context_with(greek(), &["impostor"]);

    let err = ctx.require_plugin("impostor").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadLibrary);
    assert!(
        err.to_string().contains("holds a registration for plugin delta, not impostor"),
        "unexpected message: {}",
        err
    );
}

#[test]
fn test_missing_symbol_is_bad_library() {
    let mut ctx = context_with(bad_records(), &["missing"]);

    let err = ctx.require_plugin("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadLibrary);
    assert!(
        err.to_string().contains("Cannot find registration for plugin missing in library"),
        "unexpected message: {}",
        err
    );
    assert!(!ctx.get_plugin("missing").unwrap().is_resolved());
}

#[test]
fn test_bad_magic_is_bad_library() {
    let mut ctx = context_with(bad_records(), &["garbage"]);

    let err = ctx.require_plugin("garbage").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadLibrary);
    assert!(
        err.to_string().contains("does not contain a valid plugin registration for plugin garbage"),
        "unexpected message: {}",
        err
    );
    assert!(!ctx.get_plugin("garbage").unwrap().is_resolved());
}

#[test]
fn test_unknown_version_is_bad_library() {
    let mut ctx = context_with(bad_records(), &["future"]);

    let err = ctx.require_plugin("future").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadLibrary);
    assert_eq!(err.to_string(), "Bad library: Cannot handle plugin version 99 for future");
    assert_eq!(ctx.get_plugin("future").unwrap().state(), LoadState::Unloaded);
}

#[test]
fn test_discovered_library_plugins_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let list = format!("alpha: {}\nbeta: {}\n", greek().display(), greek().display());
    std::fs::write(dir.path().join("greek.yaml"), list).expect("Failed to write plugin list");

    let mut ctx = Context::new();
    ctx.find_plugins(&[dir.path()], None).unwrap();
    ctx.load_plugins().unwrap();

    let names: Vec<String> = letters(&ctx).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["alpha", "beta"]);
}
