//! Model-specific corrections applied before a row's cubes are joined.
//!
//! Each [`ModelFix`] pairs a predicate on the catalogue row with a fix for the
//! row's cubes. [`ModelFixes::default`] holds the fixes known to be needed
//! for the BADC archive.

use tracing::info;

use catalogue::CatalogueRow;
use cmip_common::{Calendar, CmipResult};
use grid_processor::{
    clear_attributes, clear_time_long_names, promote_aux_time, relabel_calendar, unify_time_units,
};
use netcdf_parser::Cube;

/// A correction for the cubes of rows matching a predicate.
#[derive(Clone, Copy)]
pub struct ModelFix {
    pub name: &'static str,
    pub applies_to: fn(&CatalogueRow) -> bool,
    pub apply: fn(&CatalogueRow, &mut [Cube]) -> CmipResult<()>,
}

impl std::fmt::Debug for ModelFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFix").field("name", &self.name).finish()
    }
}

/// Ordered table of model fixes.
#[derive(Debug, Clone)]
pub struct ModelFixes {
    fixes: Vec<ModelFix>,
}

impl Default for ModelFixes {
    fn default() -> Self {
        Self {
            fixes: vec![EC_EARTH_FIX],
        }
    }
}

impl ModelFixes {
    /// A table with no fixes.
    pub fn none() -> Self {
        Self { fixes: Vec::new() }
    }

    pub fn with(mut self, fix: ModelFix) -> Self {
        self.fixes.push(fix);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fixes.iter().map(|f| f.name).collect()
    }

    /// Apply every matching fix in table order. Returns how many applied.
    pub fn apply(&self, row: &CatalogueRow, cubes: &mut [Cube]) -> CmipResult<usize> {
        let mut applied = 0;
        for fix in self.fixes.iter().filter(|f| (f.applies_to)(row)) {
            (fix.apply)(row, cubes)?;
            info!(fix = fix.name, model = %row.model, experiment = %row.experiment, "Applied model fix");
            applied += 1;
        }
        Ok(applied)
    }
}

// =============================================================================
// EC-EARTH
// =============================================================================

/// EC-EARTH files mix calendars, time reference units and time coordinate
/// names across segments of one run.
pub const EC_EARTH_FIX: ModelFix = ModelFix {
    name: "EC-EARTH",
    applies_to: |row| row.model == "EC-EARTH",
    apply: fix_ec_earth,
};

fn fix_ec_earth(row: &CatalogueRow, cubes: &mut [Cube]) -> CmipResult<()> {
    // gregorian and standard only agree for dates after 1582
    if row.experiment.starts_with("hist") || row.experiment.starts_with("rcp") {
        relabel_calendar(cubes, Calendar::Gregorian, Calendar::Standard)?;
    }
    promote_aux_time(cubes)?;
    unify_time_units(cubes)?;
    clear_time_long_names(cubes);
    clear_attributes(cubes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmip_common::TimeUnits;
    use netcdf_parser::{Coord, Units};

    fn row(model: &str, experiment: &str) -> CatalogueRow {
        CatalogueRow {
            centre: "ICHEC".into(),
            model: model.into(),
            experiment: experiment.into(),
            frequency: "mon".into(),
            submodel: "atmos".into(),
            cmor: "Amon".into(),
            run_id: "r1i1p1".into(),
            var: "tas".into(),
            version: "v20120101".into(),
            path: "/x".into(),
        }
    }

    fn gregorian_cube(aux_time: bool) -> Cube {
        let mut cube = Cube::new("tas", "K", vec![2], vec![1.0, 2.0]).unwrap();
        let units = TimeUnits::parse("days since 1850-01-01", Calendar::Gregorian).unwrap();
        let time = Coord::numeric("time", Units::Time(units), vec![0.0, 31.0])
            .with_long_name("Time axis");
        if aux_time {
            cube.add_aux_coord(time, Some(0)).unwrap();
        } else {
            cube.add_dim_coord(time, 0).unwrap();
        }
        cube.attributes.insert("history".into(), "x".into());
        cube
    }

    fn calendar(cube: &Cube) -> Calendar {
        cube.coord("time").unwrap().units.time().unwrap().calendar
    }

    #[test]
    fn test_ec_earth_historical() {
        let mut cubes = vec![gregorian_cube(true), gregorian_cube(false)];
        let applied = ModelFixes::default()
            .apply(&row("EC-EARTH", "historical"), &mut cubes)
            .unwrap();
        assert_eq!(applied, 1);
        for cube in &cubes {
            assert_eq!(calendar(cube), Calendar::Standard);
            assert!(cube.dim_coord(0).unwrap().is_time());
            assert!(cube.coord("time").unwrap().long_name.is_none());
            assert!(cube.attributes.is_empty());
        }
    }

    #[test]
    fn test_ec_earth_other_experiment_keeps_calendar() {
        let mut cubes = vec![gregorian_cube(true)];
        ModelFixes::default()
            .apply(&row("EC-EARTH", "piControl"), &mut cubes)
            .unwrap();
        assert_eq!(calendar(&cubes[0]), Calendar::Gregorian);
        assert!(cubes[0].dim_coord(0).is_some());
    }

    #[test]
    fn test_other_models_untouched() {
        let mut cubes = vec![gregorian_cube(true)];
        let applied = ModelFixes::default()
            .apply(&row("CMCC-CM", "historical"), &mut cubes)
            .unwrap();
        assert_eq!(applied, 0);
        assert_eq!(calendar(&cubes[0]), Calendar::Gregorian);
        assert!(!cubes[0].attributes.is_empty());
    }

    #[test]
    fn test_custom_fix() {
        const DROP_ATTRS: ModelFix = ModelFix {
            name: "drop-attrs",
            applies_to: |row| row.model == "CMCC-CM",
            apply: |_, cubes| {
                clear_attributes(cubes);
                Ok(())
            },
        };
        let fixes = ModelFixes::none().with(DROP_ATTRS);
        assert_eq!(fixes.names(), vec!["drop-attrs"]);
        let mut cubes = vec![gregorian_cube(false)];
        fixes.apply(&row("CMCC-CM", "historical"), &mut cubes).unwrap();
        assert!(cubes[0].attributes.is_empty());
    }
}
