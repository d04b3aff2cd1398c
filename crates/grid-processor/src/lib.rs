//! Cube-list operations for CMIP5 file segments.
//!
//! A CMIP5 variable for one run is usually split across several files, each
//! covering part of the time axis. This crate turns the per-file cubes into
//! a single cube:
//!
//! - **Time**: unify reference units per calendar, relabel calendars, drop
//!   timesteps already covered by an earlier segment
//! - **Grid**: make near-identical latitude/longitude coordinates identical
//! - **Sampling**: nearest-neighbour extraction of a single grid column
//! - **Concatenation**: join segments along time into exactly one cube
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{concatenate_cube, remove_time_overlaps, unify_time_units};
//!
//! unify_time_units(&mut cubes)?;
//! let cubes = remove_time_overlaps(cubes)?;
//! let cube = concatenate_cube(cubes)?;
//! ```

pub mod concatenate;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod time;

use netcdf_parser::Cube;

// Re-export commonly used types at crate root
pub use concatenate::concatenate_cube;
pub use error::{GridProcessorError, Result};
pub use grid::{allclose, unify_similar_grid_coords, GRID_ATOL, GRID_RTOL};
pub use interpolation::{interpolate_nearest, LatLon};
pub use time::{
    clear_time_long_names, promote_aux_time, relabel_calendar, remove_time_overlaps,
    unify_time_units,
};

/// Remove every cube-level attribute so per-file metadata cannot block joining.
pub fn clear_attributes(cubes: &mut [Cube]) {
    for cube in cubes.iter_mut() {
        cube.attributes.clear();
    }
}
