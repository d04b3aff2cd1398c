//! Error types for grid processing.

use cmip_common::CmipError;
use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors that can occur while combining or resampling cubes.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// The cubes cannot be joined into exactly one cube.
    #[error("{0}")]
    Concatenation(String),

    /// Interpolation error.
    #[error("interpolation error: {0}")]
    Interpolation(String),

    /// Time references could not be reconciled.
    #[error("time units error: {0}")]
    TimeUnits(String),

    /// Invalid cube structure.
    #[error(transparent)]
    Cube(#[from] NetCdfError),
}

/// Result type for grid processing operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;

impl From<CmipError> for GridProcessorError {
    fn from(err: CmipError) -> Self {
        GridProcessorError::TimeUnits(err.to_string())
    }
}

impl From<GridProcessorError> for CmipError {
    fn from(err: GridProcessorError) -> Self {
        match err {
            GridProcessorError::Concatenation(msg) => CmipError::Concatenation(msg),
            GridProcessorError::Interpolation(msg) => CmipError::Interpolation(msg),
            GridProcessorError::TimeUnits(msg) => CmipError::InvalidTimeUnits(msg),
            GridProcessorError::Cube(e) => e.into(),
        }
    }
}
