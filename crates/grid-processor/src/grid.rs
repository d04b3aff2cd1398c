//! Horizontal grid reconciliation.

use netcdf_parser::{Coord, Cube};
use tracing::debug;

/// Relative tolerance for treating two coordinate point sets as equal.
pub const GRID_RTOL: f64 = 1e-5;
/// Absolute tolerance for treating two coordinate point sets as equal.
pub const GRID_ATOL: f64 = 1e-8;

/// Element-wise `|a - b| <= atol + rtol * |b|` over equal-length slices.
pub fn allclose(a: &[f64], b: &[f64], rtol: f64, atol: f64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs())
}

fn find_coord<'a>(cube: &'a Cube, pick: fn(&Coord) -> bool) -> Option<&'a Coord> {
    cube.dim_coords
        .iter()
        .map(|c| &c.coord)
        .chain(cube.aux_coords.iter().map(|c| &c.coord))
        .find(|c| pick(c))
}

fn find_coord_mut(cube: &mut Cube, pick: fn(&Coord) -> bool) -> Option<&mut Coord> {
    cube.dim_coords
        .iter_mut()
        .map(|c| &mut c.coord)
        .chain(cube.aux_coords.iter_mut().map(|c| &mut c.coord))
        .find(|c| pick(c))
}

/// Make near-identical latitude and longitude coordinates identical.
///
/// Each cube's latitude/longitude is compared to the first cube's; when the
/// points agree within [`GRID_RTOL`]/[`GRID_ATOL`] the whole reference
/// coordinate (points, names and coordinate system) replaces it. Returns the
/// number of coordinates replaced.
pub fn unify_similar_grid_coords(cubes: &mut [Cube]) -> usize {
    let Some((first, rest)) = cubes.split_first_mut() else {
        return 0;
    };

    let mut replaced = 0;
    for pick in [Coord::is_latitude as fn(&Coord) -> bool, Coord::is_longitude] {
        let Some(reference) = find_coord(first, pick).cloned() else {
            continue;
        };
        let Some(ref_points) = reference.points.as_numeric() else {
            continue;
        };

        for cube in rest.iter_mut() {
            let var_name = cube.var_name.clone();
            let Some(coord) = find_coord_mut(cube, pick) else {
                continue;
            };
            if *coord == reference {
                continue;
            }
            let close = coord
                .points
                .as_numeric()
                .is_some_and(|p| allclose(p, ref_points, GRID_RTOL, GRID_ATOL));
            if close {
                debug!(var_name = %var_name, coord = reference.name(), "Adopting reference grid coordinate");
                *coord = reference.clone();
                replaced += 1;
            }
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_parser::{GeogCs, Units};

    fn grid_cube(lats: Vec<f64>, lons: Vec<f64>, cs: Option<GeogCs>) -> Cube {
        let n = lats.len() * lons.len();
        let mut cube = Cube::new("tas", "K", vec![lats.len(), lons.len()], vec![0.0; n]).unwrap();
        let mut lat = Coord::numeric("lat", Units::Other("degrees_north".into()), lats)
            .with_standard_name("latitude");
        if let Some(cs) = cs {
            lat = lat.with_coord_system(cs);
        }
        cube.add_dim_coord(lat, 0).unwrap();
        cube.add_dim_coord(
            Coord::numeric("lon", Units::Other("degrees_east".into()), lons)
                .with_standard_name("longitude"),
            1,
        )
        .unwrap();
        cube
    }

    #[test]
    fn test_allclose() {
        assert!(allclose(&[1.0, 2.0], &[1.0 + 1e-7, 2.0], GRID_RTOL, GRID_ATOL));
        assert!(!allclose(&[1.0, 2.0], &[1.1, 2.0], GRID_RTOL, GRID_ATOL));
        assert!(!allclose(&[1.0], &[1.0, 2.0], GRID_RTOL, GRID_ATOL));
    }

    #[test]
    fn test_near_identical_coords_adopt_reference() {
        let cs = GeogCs {
            semi_major_axis: 6371229.0,
            semi_minor_axis: 6371229.0,
        };
        let mut cubes = vec![
            grid_cube(vec![-45.0, 45.0], vec![0.0, 180.0], Some(cs)),
            grid_cube(vec![-45.000001, 45.0], vec![0.0, 180.0], None),
        ];
        assert_eq!(unify_similar_grid_coords(&mut cubes), 1);
        assert_eq!(cubes[0].coord("latitude"), cubes[1].coord("latitude"));
        assert_eq!(cubes[1].coord("latitude").unwrap().coord_system, Some(cs));
    }

    #[test]
    fn test_different_grids_untouched() {
        let mut cubes = vec![
            grid_cube(vec![-45.0, 45.0], vec![0.0, 180.0], None),
            grid_cube(vec![-30.0, 30.0], vec![0.0, 180.0], None),
        ];
        assert_eq!(unify_similar_grid_coords(&mut cubes), 0);
        assert_eq!(
            cubes[1].coord("latitude").unwrap().points.as_numeric().unwrap(),
            &[-30.0, 30.0]
        );
    }
}
