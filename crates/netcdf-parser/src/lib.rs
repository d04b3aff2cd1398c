//! Cube data model and NetCDF loading for CMIP5 model output.
//!
//! This crate provides:
//!
//! - [`Cube`]: one variable's gridded data with dimension and auxiliary
//!   coordinates, including CF time references in model calendars
//! - [`Constraint`]: selection by variable name or coordinate value
//! - [`CubeLoader`]: the loading seam, with a native NetCDF implementation
//!   ([`NetCdfLoader`]) and an in-memory one ([`MemoryLoader`])
//! - time categorisations (`year`, `month`, `clim_season`, `season_year`)
//!
//! # Implementation Notes
//!
//! Loading uses the `netcdf` crate, which wraps libnetcdf/HDF5.
//! System requirements: libhdf5-dev libnetcdf-dev.

pub mod categorise;
pub mod constraint;
pub mod cube;
pub mod error;
pub mod loader;
pub mod native;

pub use categorise::add_time_categorisations;
pub use constraint::{Constraint, ConstraintValue};
pub use cube::{Axis, AuxCoord, Coord, Cube, CubeSummary, DimCoord, GeogCs, Points, Units};
pub use error::{NetCdfError, NetCdfResult};
pub use loader::{load, CubeLoader, MemoryLoader};
pub use native::{silence_hdf5_errors, NetCdfLoader};
