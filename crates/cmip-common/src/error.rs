//! Error types for CMIP5 catalogue and retrieval operations.

use thiserror::Error;

/// Result type alias using CmipError.
pub type CmipResult<T> = Result<T, CmipError>;

/// Primary error type for catalogue queries and cube assembly.
#[derive(Debug, Error)]
pub enum CmipError {
    // === Query Errors ===
    #[error("{value} not found in column '{column}'. Available in current catalogue: {available:?}")]
    UnknownValue {
        column: String,
        value: String,
        available: Vec<String>,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No data found: {0}")]
    NotFound(String),

    #[error("More than one cube present ({0} rows). Try get_cubes instead")]
    AmbiguousResult(usize),

    // === Cube Assembly Errors ===
    #[error("More than one cube loaded from {path} ({count}), expected only one")]
    MultipleCubes { path: String, count: usize },

    #[error("Failed to concatenate cubes: {0}")]
    Concatenation(String),

    #[error("Interpolation failed: {0}")]
    Interpolation(String),

    #[error("Invalid time units: {0}")]
    InvalidTimeUnits(String),

    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalogue file error: {0}")]
    Csv(String),

    #[error("Invalid NetCDF data: {0}")]
    NetCdf(String),

    #[error("Directory traversal failed: {0}")]
    Walk(String),
}

impl CmipError {
    /// Short machine-friendly name of the error kind, logged as `error.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            CmipError::UnknownValue { .. } => "UnknownValue",
            CmipError::InvalidQuery(_) => "InvalidQuery",
            CmipError::NotFound(_) => "NotFound",
            CmipError::AmbiguousResult(_) => "AmbiguousResult",
            CmipError::MultipleCubes { .. } => "MultipleCubesError",
            CmipError::Concatenation(_) => "ConcatenationError",
            CmipError::Interpolation(_) => "InterpolationError",
            CmipError::InvalidTimeUnits(_) => "InvalidTimeUnits",
            CmipError::Io(_) => "IoError",
            CmipError::Csv(_) => "CsvError",
            CmipError::NetCdf(_) => "NetCdfError",
            CmipError::Walk(_) => "WalkError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_value_message_lists_available() {
        let err = CmipError::UnknownValue {
            column: "Model".to_string(),
            value: "NOPE".to_string(),
            available: vec!["CMCC-CM".to_string(), "HadGEM2-ES".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("NOPE not found"));
        assert!(msg.contains("CMCC-CM"));
        assert_eq!(err.kind(), "UnknownValue");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CmipError = io.into();
        assert_eq!(err.kind(), "IoError");
    }
}
