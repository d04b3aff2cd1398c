//! Turning one catalogue row into one cube.
//!
//! For each row:
//!
//! ```text
//! list files ─► load each (var constraint + labels + time categories)
//!                 │
//!                 ├─► nearest-point sample (optional)
//!                 └─► clear attributes
//!            ─► model fixes ─► unify time units ─► drop overlaps
//!            ─► unify grids ─► concatenate
//! ```

use std::path::Path;

use tracing::debug;

use catalogue::CatalogueRow;
use cmip_common::{CmipError, CmipResult};
use grid_processor::{
    clear_attributes, concatenate_cube, interpolate_nearest, remove_time_overlaps,
    unify_similar_grid_coords, unify_time_units, LatLon,
};
use netcdf_parser::{add_time_categorisations, load, Constraint, Coord, Cube, CubeLoader, NetCdfResult};

use crate::fixes::ModelFixes;
use crate::metadata::{list_row_files, FileLabels};

/// Scalar label coordinates added to every loaded cube.
pub const LABEL_COORDS: [&str; 3] = ["Model", "Experiment", "RunID"];

/// Add file labels and time categorisations to a freshly loaded cube.
pub fn label_cube(cube: &mut Cube, path: &Path, row: &CatalogueRow) -> NetCdfResult<()> {
    let labels = FileLabels::from_path(path, row);
    for (name, value) in LABEL_COORDS
        .iter()
        .zip([&labels.model, &labels.experiment, &labels.run_id])
    {
        cube.remove_coord(name);
        cube.add_aux_coord(Coord::label(name, value), None)?;
    }
    add_time_categorisations(cube)?;
    Ok(())
}

/// Load the cube for `row` from one file, if the file holds a match.
fn load_file_cube<L: CubeLoader + ?Sized>(
    loader: &L,
    row: &CatalogueRow,
    path: &Path,
    constraint: &Constraint,
) -> CmipResult<Option<Cube>> {
    let mut cubes = load(loader, path, Some(constraint), |cube, path| {
        label_cube(cube, path, row)
    })?;
    match cubes.len() {
        0 => {
            debug!(path = %path.display(), "No matching cube in file");
            Ok(None)
        }
        1 => Ok(cubes.pop()),
        count => Err(CmipError::MultipleCubes {
            path: path.display().to_string(),
            count,
        }),
    }
}

/// Load and join every file of `row` into a single cube.
pub fn assemble_row<L: CubeLoader + ?Sized>(
    loader: &L,
    row: &CatalogueRow,
    constraint: Option<&Constraint>,
    target: Option<LatLon>,
    fixes: &ModelFixes,
) -> CmipResult<Cube> {
    let mut con = Constraint::var_name(&row.var);
    if let Some(extra) = constraint {
        con = con.and(extra.clone());
    }

    let files = list_row_files(row)?;
    let mut cubes = Vec::with_capacity(files.len());
    for path in &files {
        let Some(cube) = load_file_cube(loader, row, path, &con)? else {
            continue;
        };
        let cube = match target {
            Some(point) => interpolate_nearest(&cube, point)?,
            None => cube,
        };
        cubes.push(cube);
    }
    clear_attributes(&mut cubes);

    fixes.apply(row, &mut cubes)?;

    unify_time_units(&mut cubes)?;
    let mut cubes = remove_time_overlaps(cubes)?;
    unify_similar_grid_coords(&mut cubes);

    debug!(
        path = %row.path,
        files = files.len(),
        segments = cubes.len(),
        "Joining segments"
    );
    Ok(concatenate_cube(cubes)?)
}
