//! Metadata taken from CMIP5 file names.
//!
//! CMIP5 files are named
//! `<var>_<cmor>_<model>_<experiment>_<run>[_<period>].nc`, for example
//! `tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use catalogue::CatalogueRow;
use cmip_common::CmipResult;

/// Model, experiment and run identifiers for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLabels {
    pub model: String,
    pub experiment: String,
    pub run_id: String,
}

impl FileLabels {
    /// Labels from the file name, using the row's values for any missing field.
    pub fn from_path(path: &Path, row: &CatalogueRow) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parts: Vec<&str> = stem.split('_').collect();
        let field = |i: usize, fallback: &str| {
            parts
                .get(i)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            model: field(2, &row.model),
            experiment: field(3, &row.experiment),
            run_id: field(4, &row.run_id),
        }
    }
}

/// Data files for a catalogue row, sorted by name.
///
/// Hidden files, `.nc4` files and files whose name lacks the row's run ID are
/// skipped; the latter are reported as misplaced.
pub fn list_row_files(row: &CatalogueRow) -> CmipResult<Vec<PathBuf>> {
    let dir = Path::new(&row.path);
    let names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()));
    select_row_files(dir, &row.run_id, names)
}

/// Pick the data files of run `run_id` from the names listed in `dir`.
///
/// Any listing error fails the whole selection.
fn select_row_files<I>(dir: &Path, run_id: &str, names: I) -> CmipResult<Vec<PathBuf>>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut names = names.into_iter().collect::<io::Result<Vec<String>>>()?;
    names.retain(|name| !name.starts_with('.'));
    names.sort();

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        if !name.contains(run_id) {
            warn!(
                path = %dir.display(),
                file = %name,
                run_id = %run_id,
                "Detected misplaced file"
            );
            continue;
        }
        if name.ends_with(".nc4") {
            continue;
        }
        files.push(dir.join(name));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str) -> CatalogueRow {
        CatalogueRow {
            centre: "CMCC".into(),
            model: "CMCC-CM".into(),
            experiment: "historical".into(),
            frequency: "mon".into(),
            submodel: "atmos".into(),
            cmor: "Amon".into(),
            run_id: "r1i1p1".into(),
            var: "tas".into(),
            version: "v20120101".into(),
            path: path.into(),
        }
    }

    #[test]
    fn test_labels_from_file_name() {
        let labels = FileLabels::from_path(
            Path::new("/x/tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc"),
            &row("/x"),
        );
        assert_eq!(labels.model, "CMCC-CM");
        assert_eq!(labels.experiment, "historical");
        assert_eq!(labels.run_id, "r1i1p1");
    }

    #[test]
    fn test_labels_fall_back_to_row() {
        let labels = FileLabels::from_path(Path::new("/x/tas.nc"), &row("/x"));
        assert_eq!(labels.model, "CMCC-CM");
        assert_eq!(labels.run_id, "r1i1p1");
    }

    #[test]
    fn test_list_row_files_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "tas_Amon_CMCC-CM_historical_r1i1p1_200101-200112.nc",
            "tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc",
            "tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc4",
            "tas_Amon_CMCC-CM_historical_r2i1p1_200001-200012.nc",
            ".tas_Amon_CMCC-CM_historical_r1i1p1_199901-199912.nc",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = list_row_files(&row(&dir.path().to_string_lossy())).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc",
                "tas_Amon_CMCC-CM_historical_r1i1p1_200101-200112.nc",
            ]
        );
    }

    #[test]
    fn test_listing_error_aborts_selection() {
        let names = vec![
            Ok("tas_Amon_CMCC-CM_historical_r1i1p1_200001-200012.nc".to_string()),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "unreadable entry")),
            Ok("tas_Amon_CMCC-CM_historical_r1i1p1_200101-200112.nc".to_string()),
        ];
        let err = select_row_files(Path::new("/x"), "r1i1p1", names).unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }

    #[test]
    fn test_list_missing_dir_fails() {
        assert!(list_row_files(&row("/nonexistent/cmip5/tas")).is_err());
    }
}
