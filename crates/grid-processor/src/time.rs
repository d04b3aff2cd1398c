//! Time-axis operations across the cubes of one file set.

use std::collections::HashMap;

use cmip_common::{Calendar, TimeUnits};
use netcdf_parser::{Cube, Points, Units};
use tracing::warn;

use crate::error::{GridProcessorError, Result};

/// Re-express every time coordinate against one reference per calendar.
///
/// The first time units seen for each calendar become the reference for all
/// other time coordinates in that calendar. Coordinates in different calendars
/// are left alone; concatenation will reject them.
pub fn unify_time_units(cubes: &mut [Cube]) -> Result<()> {
    let mut references: HashMap<Calendar, TimeUnits> = HashMap::new();

    for cube in cubes.iter_mut() {
        for coord in cube.time_coords_mut() {
            let Units::Time(units) = coord.units else {
                continue;
            };
            let reference = *references.entry(units.calendar).or_insert(units);
            if reference == units {
                continue;
            }
            if let Points::Numeric(points) = &mut coord.points {
                for p in points.iter_mut() {
                    *p = units.convert_to(*p, &reference)?;
                }
            }
            coord.units = Units::Time(reference);
        }
    }
    Ok(())
}

/// Rename one calendar to another on every time coordinate.
///
/// Only valid between calendars with identical date arithmetic, such as
/// `gregorian` and `standard`.
pub fn relabel_calendar(cubes: &mut [Cube], from: Calendar, to: Calendar) -> Result<usize> {
    if !from.is_equivalent(&to) {
        return Err(GridProcessorError::TimeUnits(format!(
            "{} and {} calendars are not interchangeable",
            from, to
        )));
    }
    let mut changed = 0;
    for cube in cubes.iter_mut() {
        for coord in cube.time_coords_mut() {
            if let Units::Time(units) = &mut coord.units {
                if units.calendar == from {
                    *units = units.with_calendar(to);
                    changed += 1;
                }
            }
        }
    }
    Ok(changed)
}

/// Promote time coordinates held as auxiliary coordinates to dimension coordinates.
pub fn promote_aux_time(cubes: &mut [Cube]) -> Result<usize> {
    let mut promoted = 0;
    for cube in cubes.iter_mut() {
        let candidates: Vec<String> = cube
            .aux_coords
            .iter()
            .filter(|c| c.coord.is_time() && c.dim.is_some())
            .filter(|c| c.dim.and_then(|d| cube.dim_coord(d)).is_none())
            .map(|c| c.coord.name().to_string())
            .collect();
        for name in candidates {
            cube.promote_aux_coord(&name)?;
            promoted += 1;
        }
    }
    Ok(promoted)
}

/// Remove `long_name` from every time coordinate.
pub fn clear_time_long_names(cubes: &mut [Cube]) {
    for cube in cubes.iter_mut() {
        for coord in cube.time_coords_mut() {
            coord.long_name = None;
        }
    }
}

fn time_points(cube: &Cube) -> Option<(Vec<f64>, usize, TimeUnits)> {
    let (coord, dim) = cube.time_coord()?;
    let units = *coord.units.time()?;
    let points = coord.points.as_numeric()?.to_vec();
    Some((points, dim?, units))
}

/// Drop timesteps already covered by an earlier cube.
///
/// Cubes are ordered by their first timestep; a timestep survives only if it
/// is later than every timestep kept so far, so the earlier segment wins.
/// Cubes left with no timesteps are dropped. Cubes without a time dimension,
/// or whose time units differ from the first timed cube, pass through
/// unchanged. Time units should be unified first.
pub fn remove_time_overlaps(cubes: Vec<Cube>) -> Result<Vec<Cube>> {
    if cubes.len() < 2 {
        return Ok(cubes);
    }

    let mut timed: Vec<(f64, Cube)> = Vec::new();
    let mut untimed: Vec<Cube> = Vec::new();
    let mut reference: Option<TimeUnits> = None;

    for cube in cubes {
        match time_points(&cube) {
            Some((points, _, units)) if !points.is_empty() => {
                let reference = *reference.get_or_insert(units);
                if reference == units {
                    timed.push((points[0], cube));
                } else {
                    untimed.push(cube);
                }
            }
            _ => untimed.push(cube),
        }
    }

    timed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut covered_until = f64::NEG_INFINITY;
    let mut kept = Vec::with_capacity(timed.len() + untimed.len());

    for (_, cube) in timed {
        let Some((points, dim, _)) = time_points(&cube) else {
            continue;
        };
        let keep: Vec<usize> = (0..points.len())
            .filter(|&i| points[i] > covered_until)
            .collect();
        let last_kept = keep.iter().map(|&i| points[i]).fold(covered_until, f64::max);

        if keep.is_empty() {
            warn!(
                var_name = %cube.var_name,
                start = points[0],
                "Dropping cube entirely covered by earlier segments"
            );
            continue;
        }
        if keep.len() < points.len() {
            warn!(
                var_name = %cube.var_name,
                removed = points.len() - keep.len(),
                "Removed overlapping timesteps"
            );
            kept.push(cube.select(dim, &keep)?);
        } else {
            kept.push(cube);
        }
        covered_until = last_kept;
    }

    kept.extend(untimed);
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_parser::Coord;

    fn timed_cube(units: &str, calendar: Calendar, points: Vec<f64>) -> Cube {
        let n = points.len();
        let mut cube = Cube::new("tas", "K", vec![n], (0..n).map(|v| v as f32).collect()).unwrap();
        let units = TimeUnits::parse(units, calendar).unwrap();
        cube.add_dim_coord(Coord::numeric("time", Units::Time(units), points), 0)
            .unwrap();
        cube
    }

    fn points(cube: &Cube) -> Vec<f64> {
        cube.coord("time").unwrap().points.as_numeric().unwrap().to_vec()
    }

    #[test]
    fn test_unify_rebases_to_first_reference() {
        let mut cubes = vec![
            timed_cube("days since 2000-01-01", Calendar::Standard, vec![0.0]),
            timed_cube("days since 2000-01-11", Calendar::Standard, vec![0.0, 1.0]),
        ];
        unify_time_units(&mut cubes).unwrap();
        assert_eq!(points(&cubes[1]), vec![10.0, 11.0]);
        assert_eq!(
            cubes[0].coord("time").unwrap().units,
            cubes[1].coord("time").unwrap().units
        );
    }

    #[test]
    fn test_unify_keeps_calendars_apart() {
        let mut cubes = vec![
            timed_cube("days since 2000-01-01", Calendar::Standard, vec![0.0]),
            timed_cube("days since 2000-01-11", Calendar::Gregorian, vec![0.0]),
        ];
        unify_time_units(&mut cubes).unwrap();
        assert_eq!(points(&cubes[1]), vec![0.0]);
    }

    #[test]
    fn test_relabel_calendar() {
        let mut cubes = vec![timed_cube("days since 2000-01-01", Calendar::Gregorian, vec![0.0])];
        assert_eq!(relabel_calendar(&mut cubes, Calendar::Gregorian, Calendar::Standard).unwrap(), 1);
        let units = cubes[0].coord("time").unwrap().units.time().copied().unwrap();
        assert_eq!(units.calendar, Calendar::Standard);
        assert!(relabel_calendar(&mut cubes, Calendar::Day360, Calendar::Standard).is_err());
    }

    #[test]
    fn test_promote_aux_time() {
        let mut cube = Cube::new("tas", "K", vec![2], vec![0.0, 1.0]).unwrap();
        let units = TimeUnits::parse("days since 2000-01-01", Calendar::Standard).unwrap();
        cube.add_aux_coord(Coord::numeric("time", Units::Time(units), vec![0.0, 31.0]), Some(0))
            .unwrap();
        let mut cubes = vec![cube];
        assert_eq!(promote_aux_time(&mut cubes).unwrap(), 1);
        assert!(cubes[0].dim_coord(0).unwrap().is_time());
    }

    #[test]
    fn test_overlap_first_seen_wins() {
        let cubes = vec![
            timed_cube("days since 2000-01-01", Calendar::Standard, vec![3.0, 4.0, 5.0]),
            timed_cube("days since 2000-01-01", Calendar::Standard, vec![0.0, 1.0, 2.0, 3.0]),
        ];
        let out = remove_time_overlaps(cubes).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(points(&out[0]), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(points(&out[1]), vec![4.0, 5.0]);
        assert_eq!(out[1].data, vec![1.0, 2.0]);
    }

    #[test]
    fn test_fully_covered_cube_is_dropped() {
        let cubes = vec![
            timed_cube("days since 2000-01-01", Calendar::Standard, vec![0.0, 1.0, 2.0]),
            timed_cube("days since 2000-01-01", Calendar::Standard, vec![1.0, 2.0]),
        ];
        let out = remove_time_overlaps(cubes).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_clear_long_names() {
        let mut cube = timed_cube("days since 2000-01-01", Calendar::Standard, vec![0.0]);
        cube.dim_coords[0].coord.long_name = Some("Time axis".to_string());
        let mut cubes = vec![cube];
        clear_time_long_names(&mut cubes);
        assert!(cubes[0].coord("time").unwrap().long_name.is_none());
    }
}
