//! Error types for NetCDF loading and cube manipulation.

use cmip_common::CmipError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Unparseable or unsupported time reference
    #[error("Invalid time units: {0}")]
    InvalidTimeUnits(String),
}

impl From<CmipError> for NetCdfError {
    fn from(err: CmipError) -> Self {
        match err {
            CmipError::InvalidTimeUnits(msg) => NetCdfError::InvalidTimeUnits(msg),
            CmipError::Io(e) => NetCdfError::IoError(e),
            other => NetCdfError::InvalidFormat(other.to_string()),
        }
    }
}

impl From<NetCdfError> for CmipError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::IoError(e) => CmipError::Io(e),
            NetCdfError::InvalidTimeUnits(msg) => CmipError::InvalidTimeUnits(msg),
            other => CmipError::NetCdf(other.to_string()),
        }
    }
}
