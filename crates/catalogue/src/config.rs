//! Catalogue locations.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cmip_common::CmipResult;

pub const DEFAULT_ROOT_DIR: &str = "/badc/cmip5/data/cmip5/output1";
pub const DEFAULT_LOCAL_FILE: &str = "~/.cmip5_catalogue.csv";
pub const DEFAULT_SHARED_FILE: &str =
    "/group_workspaces/jasmin/bas_climate/data/data_catalogues/cmip5_catalogue.csv";

/// Where the archive lives and where its catalogue is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    /// Root of the CMIP5 `output1` tree
    pub root_dir: PathBuf,
    /// Per-user catalogue read by queries
    pub local_file: PathBuf,
    /// Group-wide catalogue that rebuilt catalogues are published to
    pub shared_file: PathBuf,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            local_file: expand_path(DEFAULT_LOCAL_FILE),
            shared_file: PathBuf::from(DEFAULT_SHARED_FILE),
        }
    }
}

/// Expand `~` and `$VAR`/`${VAR}` in a path, leaving unknown variables as-is.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl CatalogueConfig {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        local_file: impl Into<PathBuf>,
        shared_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            local_file: local_file.into(),
            shared_file: shared_file.into(),
        }
    }

    /// Defaults overridden by `CMIP5_ROOT`, `CMIP5_CATALOGUE` and
    /// `CMIP5_SHARED_CATALOGUE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root_dir: env::var("CMIP5_ROOT")
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.root_dir),
            local_file: env::var("CMIP5_CATALOGUE")
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.local_file),
            shared_file: env::var("CMIP5_SHARED_CATALOGUE")
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.shared_file),
        }
    }

    /// Whether the shared catalogue's directory can be written to.
    pub fn shared_dir_available(&self) -> bool {
        self.shared_file
            .parent()
            .is_some_and(|dir| !dir.as_os_str().is_empty() && dir.is_dir())
    }

    /// Copy the shared catalogue over the local one when the local file is
    /// missing or older. Returns whether a copy was made.
    pub fn setup_local_file(&self) -> CmipResult<bool> {
        let Some(shared_time) = modified(&self.shared_file) else {
            debug!(shared = %self.shared_file.display(), "No shared catalogue to copy");
            return Ok(false);
        };

        let local_time = modified(&self.local_file);
        if local_time.is_some_and(|local| local >= shared_time) {
            return Ok(false);
        }

        if let Some(parent) = self.local_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&self.shared_file, &self.local_file)?;

        info!(
            shared = %self.shared_file.display(),
            local = %self.local_file.display(),
            shared_modified = %DateTime::<Utc>::from(shared_time),
            local_modified = ?local_time.map(DateTime::<Utc>::from),
            "Copied shared catalogue to local file"
        );
        Ok(true)
    }
}
