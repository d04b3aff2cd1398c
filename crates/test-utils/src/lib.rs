//! Shared test utilities for the CMIP5 workspace.
//!
//! - [`Cmip5Tree`] and [`DatasetSpec`] lay out a miniature archive on disk.
//! - [`MonthlyCube`] and [`fixed_field_cube`] build synthetic cubes to serve
//!   through a `MemoryLoader`.
//! - [`require_test_file!`] skips tests whose NetCDF sample is not present.
//!
//! ```ignore
//! use test_utils::{require_test_file, Cmip5Tree, DatasetSpec};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a sample file with [`find_test_file`], or skip the calling test.
///
/// ```ignore
/// #[test]
/// fn test_cmcc_tas() {
///     let path = require_test_file!("tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc");
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: sample '{}' not found. Set TEST_DATA_DIR to a directory holding it.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Like [`require_test_file!`] for several samples, returning a `Vec<PathBuf>`.
#[macro_export]
macro_rules! require_test_files {
    ($($name:expr),+ $(,)?) => {{
        vec![$($crate::require_test_file!($name)),+]
    }};
}

/// Assert two numbers are within `epsilon` of each other.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
