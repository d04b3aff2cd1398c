//! Common test fixtures for CMIP5 catalogue tests.
//!
//! [`Cmip5Tree`] builds a miniature archive in a temporary directory with the
//! same layout as the BADC one:
//!
//! ```text
//! <root>/<centre>/<model>/<experiment>/<frequency>/<submodel>/<cmor>/<run>/<version>/<var>/*.nc
//! <root>/<centre>/<model>/<experiment>/<frequency>/<submodel>/<cmor>/<run>/latest -> <version>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Model names used across tests.
pub mod models {
    pub const CMCC_CM: &str = "CMCC-CM";
    pub const EC_EARTH: &str = "EC-EARTH";
    pub const HADGEM2_AO: &str = "HadGEM2-AO";
    pub const HADGEM2_CC: &str = "HadGEM2-CC";
}

/// File names following the CMIP5 DRS filename convention.
pub mod files {
    /// `<var>_<cmor>_<model>_<experiment>_<run>_<period>.nc`
    pub const CMCC_TAS_2000: &str = "tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc";
    pub const CMCC_TAS_2001: &str = "tas_Amon_CMCC-CM_historical_r1i1p1_200101-200112.nc";
}

/// One `<run>/<version>/<var>` directory and the files inside it.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub centre: String,
    pub model: String,
    pub experiment: String,
    pub frequency: String,
    pub submodel: String,
    pub cmor: String,
    pub run: String,
    pub version: String,
    pub var: String,
    pub files: Vec<String>,
}

impl DatasetSpec {
    /// Monthly atmosphere data (`atmos`/`Amon`) at version `v20120101`.
    pub fn new(centre: &str, model: &str, experiment: &str, run: &str, var: &str) -> Self {
        Self {
            centre: centre.to_string(),
            model: model.to_string(),
            experiment: experiment.to_string(),
            frequency: "mon".to_string(),
            submodel: "atmos".to_string(),
            cmor: "Amon".to_string(),
            run: run.to_string(),
            version: "v20120101".to_string(),
            var: var.to_string(),
            files: Vec::new(),
        }
    }

    /// Fixed field (`fx`) dataset, which CMIP5 stores under run `r0i0p0`.
    pub fn fx(centre: &str, model: &str, experiment: &str, var: &str) -> Self {
        Self {
            frequency: "fx".to_string(),
            cmor: "fx".to_string(),
            ..Self::new(centre, model, experiment, "r0i0p0", var)
        }
    }

    pub fn frequency(mut self, frequency: &str) -> Self {
        self.frequency = frequency.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add a file with an explicit name.
    pub fn file(mut self, name: &str) -> Self {
        self.files.push(name.to_string());
        self
    }

    /// Add a file named by the DRS convention for `period` (e.g. `200001-200012`).
    pub fn period(self, period: &str) -> Self {
        let name = self.file_name(period);
        self.file(&name)
    }

    /// `<var>_<cmor>_<model>_<experiment>_<run>_<period>.nc`
    pub fn file_name(&self, period: &str) -> String {
        if self.frequency == "fx" {
            format!(
                "{}_{}_{}_{}_{}.nc",
                self.var, self.cmor, self.model, self.experiment, self.run
            )
        } else {
            format!(
                "{}_{}_{}_{}_{}_{}.nc",
                self.var, self.cmor, self.model, self.experiment, self.run, period
            )
        }
    }

    fn run_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.centre)
            .join(&self.model)
            .join(&self.experiment)
            .join(&self.frequency)
            .join(&self.submodel)
            .join(&self.cmor)
            .join(&self.run)
    }
}

/// A miniature CMIP5 archive, removed when dropped.
pub struct Cmip5Tree {
    dir: TempDir,
}

impl Cmip5Tree {
    pub fn new() -> Self {
        Self {
            dir: crate::temp_test_dir_with_prefix("cmip5_tree_"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create the dataset's versioned directory, its files and the `latest`
    /// link. Returns the versioned variable directory, which is the path the
    /// catalogue records for it.
    pub fn add(&self, spec: &DatasetSpec) -> PathBuf {
        let run_dir = spec.run_dir(self.root());
        let var_dir = run_dir.join(&spec.version).join(&spec.var);
        fs::create_dir_all(&var_dir).expect("Failed to create dataset directory");

        for name in &spec.files {
            fs::write(var_dir.join(name), b"").expect("Failed to create dataset file");
        }

        let latest = run_dir.join("latest");
        if fs::symlink_metadata(&latest).is_err() {
            std::os::unix::fs::symlink(&spec.version, &latest)
                .expect("Failed to create latest symlink");
        }
        var_dir
    }

    /// Create a directory at `relative` that is not part of any dataset.
    pub fn add_dir(&self, relative: &str) -> PathBuf {
        let dir = self.root().join(relative);
        fs::create_dir_all(&dir).expect("Failed to create directory");
        dir
    }
}

impl Default for Cmip5Tree {
    fn default() -> Self {
        Self::new()
    }
}
