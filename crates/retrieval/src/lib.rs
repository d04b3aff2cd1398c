//! Cube retrieval for CMIP5 catalogue rows.
//!
//! Each catalogue row names one `<run>/<version>/<var>` directory. Retrieval
//! loads every file in it, labels each cube with model, experiment and run,
//! applies model fixes and joins the segments along time into one cube.
//!
//! # Example
//!
//! ```ignore
//! use catalogue::{CatalogueConfig, Column, FilterSpec};
//! use retrieval::{Archive, CatalogueOptions};
//!
//! let archive = Archive::open(CatalogueConfig::from_env());
//! let spec = FilterSpec::new()
//!     .with(Column::Model, "CMCC-CM")
//!     .with(Column::Var, "tas");
//! let rows = archive.catalogue(&spec, CatalogueOptions::default())?;
//! let cubes = archive.get_cubes(&rows, None, None)?;
//! ```

pub mod archive;
pub mod assembly;
pub mod fixes;
pub mod fx;
pub mod metadata;

pub use archive::{Archive, CatalogueOptions};
pub use assembly::{assemble_row, label_cube, LABEL_COORDS};
pub use fixes::{ModelFix, ModelFixes, EC_EARTH_FIX};
pub use fx::{fx_model, preferred_experiment, FX_ALIASES, FX_EXPERIMENTS, LAND_FRACTION, OROGRAPHY};
pub use metadata::{list_row_files, FileLabels};
