//! Joining cubes end-to-end along time.
//!
//! Segments must agree on everything except their time extent: variable
//! name, units, shape outside the time dimension, time units, every other
//! coordinate and the attributes. Time must increase strictly across the
//! joined result.

use netcdf_parser::{AuxCoord, Coord, Cube};

use crate::error::{GridProcessorError, Result};

fn fail<T>(msg: impl Into<String>) -> Result<T> {
    Err(GridProcessorError::Concatenation(msg.into()))
}

/// Time dimension of a cube, from its time dimension coordinate.
fn time_dim(cube: &Cube) -> Option<usize> {
    cube.dim_coords
        .iter()
        .find(|c| c.coord.is_time())
        .map(|c| c.dim)
}

fn time_values(cube: &Cube, dim: usize) -> Result<&[f64]> {
    match cube.dim_coord(dim).and_then(|c| c.points.as_numeric()) {
        Some(points) => Ok(points),
        None => fail(format!("{}: time points are not numeric", cube.var_name)),
    }
}

fn check_compatible(reference: &Cube, other: &Cube, dim: usize) -> Result<()> {
    let name = &reference.var_name;
    if other.var_name != reference.var_name {
        return fail(format!(
            "cannot join {} with {}",
            reference.var_name, other.var_name
        ));
    }
    if other.units != reference.units {
        return fail(format!(
            "{}: units differ ({} vs {})",
            name, reference.units, other.units
        ));
    }
    if other.ndim() != reference.ndim() {
        return fail(format!(
            "{}: dimensionality differs ({} vs {})",
            name,
            reference.ndim(),
            other.ndim()
        ));
    }
    if time_dim(other) != Some(dim) {
        return fail(format!("{}: time is not on the same dimension", name));
    }
    for d in (0..reference.ndim()).filter(|&d| d != dim) {
        if reference.shape[d] != other.shape[d] {
            return fail(format!(
                "{}: dimension {} differs ({} vs {})",
                name, d, reference.shape[d], other.shape[d]
            ));
        }
        if reference.dim_coord(d) != other.dim_coord(d) {
            return fail(format!("{}: coordinates on dimension {} differ", name, d));
        }
    }
    if reference.dim_coord(dim).map(|c| &c.units) != other.dim_coord(dim).map(|c| &c.units) {
        return fail(format!("{}: time units differ", name));
    }

    let fixed = |cube: &Cube| -> Vec<AuxCoord> {
        cube.aux_coords
            .iter()
            .filter(|c| c.dim != Some(dim))
            .cloned()
            .collect()
    };
    if fixed(reference) != fixed(other) {
        return fail(format!("{}: scalar or non-time coordinates differ", name));
    }
    let spanning = |cube: &Cube| -> Vec<String> {
        cube.aux_coords
            .iter()
            .filter(|c| c.dim == Some(dim))
            .map(|c| c.coord.name().to_string())
            .collect()
    };
    if spanning(reference) != spanning(other) {
        return fail(format!("{}: time-dependent coordinates differ", name));
    }
    if reference.attributes != other.attributes {
        return fail(format!("{}: attributes differ", name));
    }
    Ok(())
}

fn join_coord(target: &mut Coord, next: &Coord) -> Result<()> {
    target.points.extend(&next.points).map_err(GridProcessorError::from)
}

/// Join a list of cubes along time into exactly one cube.
///
/// A single cube is returned as it is. Segments are ordered by their first
/// time value before joining.
pub fn concatenate_cube(mut cubes: Vec<Cube>) -> Result<Cube> {
    match cubes.len() {
        0 => return fail("no cubes to concatenate"),
        1 => return Ok(cubes.remove(0)),
        _ => {}
    }

    let Some(dim) = time_dim(&cubes[0]) else {
        return fail(format!(
            "{}: {} cubes without a time dimension",
            cubes[0].var_name,
            cubes.len()
        ));
    };
    for cube in &cubes[1..] {
        check_compatible(&cubes[0], cube, dim)?;
    }

    let mut starts = Vec::with_capacity(cubes.len());
    for cube in &cubes {
        starts.push(time_values(cube, dim)?.first().copied().unwrap_or(f64::NAN));
    }
    let mut order: Vec<usize> = (0..cubes.len()).collect();
    order.sort_by(|&a, &b| starts[a].total_cmp(&starts[b]));

    let mut previous = f64::NEG_INFINITY;
    for &i in &order {
        for &t in time_values(&cubes[i], dim)? {
            if t <= previous {
                return fail(format!(
                    "{}: time is not strictly increasing ({} after {})",
                    cubes[i].var_name, t, previous
                ));
            }
            previous = t;
        }
    }

    let mut segments: Vec<Option<Cube>> = cubes.into_iter().map(Some).collect();
    let mut ordered = order.iter().filter_map(|&i| segments[i].take());
    let Some(mut joined) = ordered.next() else {
        return fail("no cubes to concatenate");
    };
    let rest: Vec<Cube> = ordered.collect();

    let outer: usize = joined.shape[..dim].iter().product();
    let inner: usize = joined.shape[dim + 1..].iter().product();
    let total: usize = joined.shape[dim] + rest.iter().map(|c| c.shape[dim]).sum::<usize>();

    let mut data = Vec::with_capacity(outer * total * inner);
    for o in 0..outer {
        for cube in std::iter::once(&joined).chain(rest.iter()) {
            let block = cube.shape[dim] * inner;
            data.extend_from_slice(&cube.data[o * block..(o + 1) * block]);
        }
    }

    for cube in &rest {
        for dc in joined.dim_coords.iter_mut().filter(|c| c.dim == dim) {
            if let Some(next) = cube.dim_coord(dim) {
                join_coord(&mut dc.coord, next)?;
            }
        }
        for ac in joined.aux_coords.iter_mut().filter(|c| c.dim == Some(dim)) {
            let name = ac.coord.name().to_string();
            let next = cube
                .aux_coords
                .iter()
                .find(|c| c.dim == Some(dim) && c.coord.name() == name);
            match next {
                Some(next) => join_coord(&mut ac.coord, &next.coord)?,
                None => return fail(format!("{}: {} missing from a segment", cube.var_name, name)),
            }
        }
    }

    joined.shape[dim] = total;
    joined.data = data;
    Ok(joined)
}
