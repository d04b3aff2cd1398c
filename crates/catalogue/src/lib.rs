//! CMIP5 archive catalogue.
//!
//! Provides:
//! - A flat table of the archive's (run, variable) directories, persisted as CSV
//! - A scanner that rebuilds the table from the archive directory tree
//! - Column/value filtering, optionally restricted to complete variable sets
//! - Locations of the local and shared catalogue files

pub mod builder;
pub mod catalog;
pub mod config;
pub mod filter;

pub use builder::{rebuild, scan_archive};
pub use catalog::{Catalogue, CatalogueRow, Column};
pub use config::{expand_path, CatalogueConfig};
pub use filter::{filter, FilterSpec};
