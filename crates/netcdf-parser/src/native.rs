//! Native NetCDF loading using the netcdf library.
//!
//! Every variable that is not itself a coordinate (a variable named after its
//! only dimension), a bounds variable, or listed in another variable's
//! `coordinates` attribute becomes one [`Cube`]. Coordinate variables become
//! dimension coordinates; variables named in `coordinates` become auxiliary
//! coordinates. Fill values become NaN and packed data is unpacked.
//!
//! A `grid_mapping` variable with `earth_radius` or `semi_major_axis` gives
//! the latitude and longitude coordinates their [`GeogCs`].

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Once;

use tracing::debug;

use crate::cube::{Axis, Coord, Cube, GeogCs, Points, Units};
use crate::error::{NetCdfError, NetCdfResult};
use crate::loader::CubeLoader;

/// Attributes interpreted while loading; not copied onto the cube.
const RESERVED_ATTRIBUTES: &[&str] = &[
    "_FillValue",
    "missing_value",
    "scale_factor",
    "add_offset",
    "units",
    "standard_name",
    "long_name",
    "coordinates",
    "bounds",
    "calendar",
    "axis",
    "grid_mapping",
];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Loads cubes from NetCDF-3/4 files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfLoader;

impl NetCdfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl CubeLoader for NetCdfLoader {
    fn load_file(&self, path: &Path) -> NetCdfResult<Vec<Cube>> {
        silence_hdf5_errors();

        let file = netcdf::open(path).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let global_attributes: BTreeMap<String, String> = file
            .attributes()
            .filter_map(|attr| {
                let value = attr.value().ok()?;
                Some((attr.name().to_string(), attr_to_string(&value)))
            })
            .collect();

        // Names that describe other variables rather than being data.
        let mut auxiliary: HashSet<String> = HashSet::new();
        for var in file.variables() {
            if let Some(names) = get_string_attr(&var, "coordinates") {
                auxiliary.extend(names.split_whitespace().map(str::to_string));
            }
            if let Some(bounds) = get_string_attr(&var, "bounds") {
                auxiliary.insert(bounds);
            }
        }

        let mut cubes = Vec::new();
        for var in file.variables() {
            let name = var.name();
            let dims = var.dimensions();
            if dims.is_empty() || auxiliary.contains(&name) || is_coordinate_variable(&var) {
                continue;
            }

            let cube = read_cube(&file, &var, &global_attributes)?;
            debug!(
                path = %path.display(),
                var_name = %cube.var_name,
                shape = ?cube.shape,
                "Read NetCDF variable"
            );
            cubes.push(cube);
        }

        Ok(cubes)
    }
}

fn is_coordinate_variable(var: &netcdf::Variable) -> bool {
    let dims = var.dimensions();
    dims.len() == 1 && dims[0].name() == var.name()
}

fn read_cube(
    file: &netcdf::File,
    var: &netcdf::Variable,
    global_attributes: &BTreeMap<String, String>,
) -> NetCdfResult<Cube> {
    let var_name = var.name();
    let dim_names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", var_name, e)))?;

    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0) as f32;
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0) as f32;
    let fill_values: Vec<f32> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|n| get_f64_attr(var, n))
        .map(|v| v as f32)
        .collect();

    let data = raw
        .into_iter()
        .map(|v| {
            if fill_values.iter().any(|&f| v == f) {
                f32::NAN
            } else {
                v * scale_factor + add_offset
            }
        })
        .collect();

    let units = get_string_attr(var, "units").unwrap_or_else(|| "1".to_string());
    let mut cube = Cube::new(&var_name, &units, shape, data)?;
    cube.standard_name = get_string_attr(var, "standard_name");
    cube.long_name = get_string_attr(var, "long_name");

    for (dim, dim_name) in dim_names.iter().enumerate() {
        if let Some(coord_var) = file.variable(dim_name) {
            if is_coordinate_variable(&coord_var) {
                cube.add_dim_coord(read_coord(&coord_var)?, dim)?;
            }
        }
    }

    if let Some(names) = get_string_attr(var, "coordinates") {
        for aux_name in names.split_whitespace() {
            let Some(aux_var) = file.variable(aux_name) else {
                debug!(var_name = %var_name, coord = aux_name, "Auxiliary coordinate not in file");
                continue;
            };
            let aux_dims: Vec<String> = aux_var.dimensions().iter().map(|d| d.name()).collect();
            let dim = match aux_dims.as_slice() {
                [] => None,
                [single] => match dim_names.iter().position(|d| d == single) {
                    Some(d) => Some(d),
                    None => continue,
                },
                _ => {
                    debug!(coord = aux_name, "Skipping multi-dimensional auxiliary coordinate");
                    continue;
                }
            };
            cube.add_aux_coord(read_coord(&aux_var)?, dim)?;
        }
    }

    if let Some(cs) = read_grid_mapping(file, var) {
        set_horizontal_coord_system(&mut cube, cs);
    }

    let mut attributes = global_attributes.clone();
    for attr in var.attributes() {
        if RESERVED_ATTRIBUTES.contains(&attr.name()) {
            continue;
        }
        if let Ok(value) = attr.value() {
            attributes.insert(attr.name().to_string(), attr_to_string(&value));
        }
    }
    cube.attributes = attributes;

    Ok(cube)
}

fn read_coord(var: &netcdf::Variable) -> NetCdfResult<Coord> {
    let name = var.name();
    let points: Vec<f64> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;

    let calendar = get_string_attr(var, "calendar");
    let units = match get_string_attr(var, "units") {
        Some(u) => Units::parse(&u, calendar.as_deref()),
        None => Units::NoUnit,
    };
    let standard_name = get_string_attr(var, "standard_name");

    let axis = match get_string_attr(var, "axis").as_deref() {
        Some("X") => Some(Axis::X),
        Some("Y") => Some(Axis::Y),
        Some("Z") => Some(Axis::Z),
        Some("T") => Some(Axis::T),
        _ => match standard_name.as_deref() {
            Some("longitude") => Some(Axis::X),
            Some("latitude") => Some(Axis::Y),
            Some("time") => Some(Axis::T),
            _ if units.is_time_reference() => Some(Axis::T),
            _ => None,
        },
    };

    Ok(Coord {
        var_name: Some(name),
        standard_name,
        long_name: get_string_attr(var, "long_name"),
        units,
        points: Points::Numeric(points),
        axis,
        coord_system: None,
    })
}

/// Ellipsoid of the variable's `grid_mapping`, if it names one.
fn read_grid_mapping(file: &netcdf::File, var: &netcdf::Variable) -> Option<GeogCs> {
    let name = get_string_attr(var, "grid_mapping")?;
    let Some(mapping) = file.variable(&name) else {
        debug!(var_name = %var.name(), grid_mapping = %name, "Grid mapping not in file");
        return None;
    };
    geog_cs_from_params(
        get_f64_attr(&mapping, "earth_radius"),
        get_f64_attr(&mapping, "semi_major_axis"),
        get_f64_attr(&mapping, "semi_minor_axis"),
        get_f64_attr(&mapping, "inverse_flattening"),
    )
}

fn geog_cs_from_params(
    earth_radius: Option<f64>,
    semi_major: Option<f64>,
    semi_minor: Option<f64>,
    inverse_flattening: Option<f64>,
) -> Option<GeogCs> {
    if let Some(r) = earth_radius {
        return Some(GeogCs {
            semi_major_axis: r,
            semi_minor_axis: r,
        });
    }
    let a = semi_major?;
    let b = match (semi_minor, inverse_flattening) {
        (Some(b), _) => b,
        (None, Some(f)) if f != 0.0 => a * (1.0 - 1.0 / f),
        _ => a,
    };
    Some(GeogCs {
        semi_major_axis: a,
        semi_minor_axis: b,
    })
}

fn set_horizontal_coord_system(cube: &mut Cube, cs: GeogCs) {
    let coords = cube
        .dim_coords
        .iter_mut()
        .map(|c| &mut c.coord)
        .chain(cube.aux_coords.iter_mut().map(|c| &mut c.coord));
    for coord in coords.filter(|c| c.is_latitude() || c.is_longitude()) {
        coord.coord_system = Some(cs);
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn attr_to_string(value: &netcdf::AttributeValue) -> String {
    use netcdf::AttributeValue as A;
    match value {
        A::Str(s) => s.clone(),
        A::Strs(v) => v.join(" "),
        A::Double(v) => v.to_string(),
        A::Float(v) => v.to_string(),
        A::Int(v) => v.to_string(),
        A::Short(v) => v.to_string(),
        A::Longlong(v) => v.to_string(),
        A::Doubles(v) => join_numbers(v),
        A::Floats(v) => join_numbers(v),
        A::Ints(v) => join_numbers(v),
        other => format!("{:?}", other),
    }
}

fn join_numbers<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Strs(v) => Some(v.join(" ")),
        _ => None,
    }
}
