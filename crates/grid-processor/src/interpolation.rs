//! Nearest-neighbour point sampling.

use netcdf_parser::{Cube, Points};
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// A geographic sample point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Angular distance between two longitudes, in `[0, 180]`.
fn lon_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn nearest_index(points: &[f64], target: f64, distance: fn(f64, f64) -> f64) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .min_by(|(_, a), (_, b)| distance(**a, target).total_cmp(&distance(**b, target)))
        .map(|(i, _)| i)
}

fn grid_axis(cube: &Cube, latitude: bool) -> Result<(usize, String)> {
    let which = if latitude { "latitude" } else { "longitude" };
    cube.dim_coords
        .iter()
        .find(|c| {
            if latitude {
                c.coord.is_latitude()
            } else {
                c.coord.is_longitude()
            }
        })
        .map(|c| (c.dim, c.coord.name().to_string()))
        .ok_or_else(|| {
            GridProcessorError::Interpolation(format!(
                "{} has no {} dimension coordinate",
                cube.var_name, which
            ))
        })
}

/// Sample the grid point nearest to `target`.
///
/// Longitudes are compared modulo 360. Latitude and longitude become scalar
/// coordinates whose value is the requested point.
pub fn interpolate_nearest(cube: &Cube, target: LatLon) -> Result<Cube> {
    let (lat_dim, lat_name) = grid_axis(cube, true)?;
    let (lon_dim, lon_name) = grid_axis(cube, false)?;

    let lat_points = numeric_points(cube, &lat_name)?;
    let lon_points = numeric_points(cube, &lon_name)?;

    let lat_index = nearest_index(lat_points, target.lat, |a, b| (a - b).abs())
        .ok_or_else(|| GridProcessorError::Interpolation("latitude has no valid points".into()))?;
    let lon_index = nearest_index(lon_points, target.lon, lon_distance)
        .ok_or_else(|| GridProcessorError::Interpolation("longitude has no valid points".into()))?;

    // Collapse the later dimension first so the earlier index stays valid.
    let (first, second) = if lat_dim > lon_dim {
        ((lat_dim, lat_index), (lon_dim, lon_index))
    } else {
        ((lon_dim, lon_index), (lat_dim, lat_index))
    };
    let mut point = cube.collapse_dim(first.0, first.1)?.collapse_dim(second.0, second.1)?;

    set_scalar_point(&mut point, &lat_name, target.lat);
    set_scalar_point(&mut point, &lon_name, target.lon);
    Ok(point)
}

fn numeric_points<'a>(cube: &'a Cube, name: &str) -> Result<&'a [f64]> {
    cube.coord(name)
        .and_then(|c| c.points.as_numeric())
        .ok_or_else(|| GridProcessorError::Interpolation(format!("{} points are not numeric", name)))
}

fn set_scalar_point(cube: &mut Cube, name: &str, value: f64) {
    if let Some(aux) = cube
        .aux_coords
        .iter_mut()
        .find(|c| c.dim.is_none() && c.coord.matches_name(name))
    {
        aux.coord.points = Points::Numeric(vec![value]);
    }
}
