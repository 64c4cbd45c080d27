//! Loading real shared libraries from the system

use std::path::{Path, PathBuf};
use std::sync::Arc;

use toolhost_loader::{CapabilityScanner, LoaderError, ModuleKind, ModuleLoader};

/// A shared library present on most systems, if any
fn system_library() -> Option<PathBuf> {
    [
        "/lib/x86_64-linux-gnu/libc.so.6",
        "/lib/aarch64-linux-gnu/libc.so.6",
        "/usr/lib/x86_64-linux-gnu/libc.so.6",
        "/usr/lib/aarch64-linux-gnu/libc.so.6",
        "/lib64/libc.so.6",
        "/usr/lib64/libc.so.6",
        "/usr/lib/libc.so.6",
        "/usr/lib/libSystem.B.dylib",
    ]
    .iter()
    .map(Path::new)
    .find(|path| path.is_file())
    .map(Path::to_path_buf)
}

#[test]
fn test_load_is_idempotent() {
    let Some(path) = system_library() else {
        eprintln!("no system library found, skipping");
        return;
    };

    let loader = ModuleLoader::new();
    let first = loader.load(&path).unwrap();
    let second = loader.load(&path).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.len(), 1);
    assert_eq!(first.kind(), ModuleKind::Dynamic);
    assert!(first.path().is_some());
}

#[test]
fn test_load_by_differently_cased_name_hits_cache() {
    let Some(path) = system_library() else {
        eprintln!("no system library found, skipping");
        return;
    };

    let loader = ModuleLoader::new();
    let loaded = loader.load(&path).unwrap();

    let stem = path.file_name().unwrap().to_string_lossy().to_uppercase();
    let renamed = Path::new("/nonexistent/dir").join(stem);
    let cached = loader.load(&renamed).unwrap();

    assert!(Arc::ptr_eq(&loaded, &cached));
}

#[test]
fn test_library_without_tool_table() {
    let Some(path) = system_library() else {
        eprintln!("no system library found, skipping");
        return;
    };

    let loader = ModuleLoader::new();
    let module = loader.load(&path).unwrap();

    assert!(matches!(
        module.tool_table(),
        Err(LoaderError::PluginNotFound { .. })
    ));
    assert!(matches!(
        CapabilityScanner::discover(&module),
        Err(LoaderError::PluginNotFound { .. })
    ));
}
