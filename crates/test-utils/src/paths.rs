//! Path utilities for locating test data files.
//!
//! Real CMIP5 NetCDF samples are large and not checked in; tests that need
//! one look for it here and skip when it is absent.

use std::path::PathBuf;

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let root = manifest_dir.ancestors().nth(2).map(PathBuf::from);
    root.unwrap_or(manifest_dir)
}

/// First existing copy of sample file `name`, looked up in `$TEST_DATA_DIR`,
/// then `crates/netcdf-parser/testdata`, `crates/retrieval/testdata` and
/// `testdata` under the workspace root.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        root.join("crates/netcdf-parser/testdata").join(name),
        root.join("crates/retrieval/testdata").join(name),
        root.join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

/// Scratch directory removed on drop, named `<prefix>XXXXXX`.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}
