//! Catalogue construction from the archive directory tree.
//!
//! The archive is laid out as
//! `<root>/<centre>/<model>/<experiment>/<frequency>/<submodel>/<cmor>/<run>/latest/<var>`,
//! where `latest` links to a `vYYYYMMDD` version directory. Only variables
//! reachable through `latest` are catalogued.

use std::fs;
use std::path::{Component, Path};

use tracing::{info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use cmip_common::{CmipError, CmipResult};

use crate::catalog::{Catalogue, CatalogueRow};
use crate::config::CatalogueConfig;

/// Depth of the `<var>` directories below the root.
const VAR_DEPTH: usize = 9;
/// Depth of the `latest` link below the root.
const LATEST_DEPTH: usize = 8;
/// Directories below the root that identify one progress step
/// (centre/model/experiment/frequency).
const PROGRESS_DEPTH: usize = 4;

fn component_names(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn keep_entry(entry: &DirEntry) -> bool {
    entry.depth() != LATEST_DEPTH || entry.file_name() == "latest"
}

/// Whether `var_dir` is reached through the run's `latest` link.
fn through_latest(root: &Path, var_dir: &Path) -> bool {
    var_dir
        .strip_prefix(root)
        .map(component_names)
        .ok()
        .and_then(|parts| parts.get(LATEST_DEPTH - 1).cloned())
        .is_some_and(|name| name == "latest")
}

/// Build the row for a `<run>/latest/<var>` directory.
fn row_for(root: &Path, var_dir: &Path) -> CmipResult<CatalogueRow> {
    let relative = var_dir
        .strip_prefix(root)
        .map_err(|e| CmipError::Walk(format!("{}: {}", var_dir.display(), e)))?;
    let parts = component_names(relative);
    let [centre, model, experiment, frequency, submodel, cmor, run_id, _latest, var] =
        <[String; VAR_DEPTH]>::try_from(parts).map_err(|parts| {
            CmipError::Walk(format!(
                "{}: expected {} path segments below the root, found {}",
                var_dir.display(),
                VAR_DEPTH,
                parts.len()
            ))
        })?;

    let real = fs::canonicalize(var_dir)?;
    let version = real
        .parent()
        .and_then(|p| p.file_name())
        .map(|v| v.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CmipError::Walk(format!("{} resolves to {}", var_dir.display(), real.display()))
        })?;

    let run_dir = var_dir
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| CmipError::Walk(format!("{} has no run directory", var_dir.display())))?;
    let path = run_dir.join(&version).join(&var);

    Ok(CatalogueRow {
        centre,
        model,
        experiment,
        frequency,
        submodel,
        cmor,
        run_id,
        var,
        version,
        path: path.to_string_lossy().into_owned(),
    })
}

/// Scan the archive under `root`, one row per `<run>/latest/<var>` directory,
/// in lexical path order.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn scan_archive(root: &Path) -> CmipResult<Catalogue> {
    if !root.is_dir() {
        return Err(CmipError::Walk(format!(
            "archive root {} is not a directory",
            root.display()
        )));
    }

    // Entries shallower than min_depth never reach filter_entry, so depth is
    // checked in the loop rather than with min_depth.
    let walker = WalkDir::new(root)
        .max_depth(VAR_DEPTH)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep_entry);

    let mut rows = Vec::new();
    let mut current_group: Option<Vec<String>> = None;

    for entry in walker {
        let entry = entry.map_err(|e| CmipError::Walk(e.to_string()))?;
        if entry.depth() != VAR_DEPTH || !entry.file_type().is_dir() || !through_latest(root, entry.path()) {
            continue;
        }

        let group: Vec<String> = entry
            .path()
            .strip_prefix(root)
            .map(component_names)
            .unwrap_or_default()
            .into_iter()
            .take(PROGRESS_DEPTH)
            .collect();
        if current_group.as_ref() != Some(&group) {
            info!(group = %group.join("/"), rows = rows.len(), "Scanning");
            current_group = Some(group);
        }

        rows.push(row_for(root, entry.path())?);
    }

    info!(rows = rows.len(), "Archive scan complete");
    Ok(Catalogue::new(rows))
}

/// Rebuild the catalogue from the archive and write it to the local file.
///
/// The new file is also copied to the shared location when its directory is
/// reachable.
pub fn rebuild(config: &CatalogueConfig) -> CmipResult<Catalogue> {
    info!(root = %config.root_dir.display(), "Building catalogue, this could take a while");
    let catalogue = scan_archive(&config.root_dir)?;
    catalogue.write_csv(&config.local_file)?;
    info!(path = %config.local_file.display(), rows = catalogue.len(), "Wrote catalogue");

    if config.shared_dir_available() {
        match fs::copy(&config.local_file, &config.shared_file) {
            Ok(_) => info!(path = %config.shared_file.display(), "Copied catalogue to shared location"),
            Err(e) => warn!(
                path = %config.shared_file.display(),
                error = %e,
                "Could not copy catalogue to shared location"
            ),
        }
    }

    Ok(catalogue)
}
