//! In-memory gridded data ("cubes").
//!
//! A [`Cube`] holds one variable's data as a flat row-major `f32` array
//! together with the coordinates describing each dimension. Missing values
//! are stored as NaN.

use std::collections::BTreeMap;
use std::fmt;

use cmip_common::{CalendarDate, TimeUnits};
use serde::Serialize;

use crate::error::{NetCdfError, NetCdfResult};

/// Units of a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum Units {
    /// A CF time reference (`days since ...`) with its calendar
    Time(TimeUnits),
    /// Any other unit string, kept verbatim
    Other(String),
    /// Label coordinates (`no_unit`)
    NoUnit,
}

impl Units {
    /// Interpret a CF `units` attribute, using `calendar` for time references.
    pub fn parse(units: &str, calendar: Option<&str>) -> Self {
        let trimmed = units.trim();
        if trimmed.is_empty() || trimmed == "no_unit" {
            return Units::NoUnit;
        }
        if trimmed.contains(" since ") {
            let calendar = calendar
                .and_then(|c| c.parse().ok())
                .unwrap_or_default();
            if let Ok(time) = TimeUnits::parse(trimmed, calendar) {
                return Units::Time(time);
            }
        }
        Units::Other(trimmed.to_string())
    }

    pub fn is_time_reference(&self) -> bool {
        matches!(self, Units::Time(_))
    }

    pub fn time(&self) -> Option<&TimeUnits> {
        match self {
            Units::Time(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Time(t) => write!(f, "{} ({})", t, t.calendar),
            Units::Other(s) => f.write_str(s),
            Units::NoUnit => f.write_str("no_unit"),
        }
    }
}

/// Coordinate values.
#[derive(Debug, Clone, PartialEq)]
pub enum Points {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

impl Points {
    pub fn len(&self) -> usize {
        match self {
            Points::Numeric(v) => v.len(),
            Points::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Points::Numeric(v) => Some(v),
            Points::Labels(_) => None,
        }
    }

    pub fn as_labels(&self) -> Option<&[String]> {
        match self {
            Points::Labels(v) => Some(v),
            Points::Numeric(_) => None,
        }
    }

    fn select(&self, indices: &[usize]) -> Points {
        match self {
            Points::Numeric(v) => Points::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Points::Labels(v) => Points::Labels(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Append another set of points of the same kind.
    pub fn extend(&mut self, other: &Points) -> NetCdfResult<()> {
        match (self, other) {
            (Points::Numeric(a), Points::Numeric(b)) => a.extend_from_slice(b),
            (Points::Labels(a), Points::Labels(b)) => a.extend(b.iter().cloned()),
            _ => {
                return Err(NetCdfError::InvalidFormat(
                    "cannot join numeric and label points".to_string(),
                ))
            }
        }
        Ok(())
    }
}

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    X,
    Y,
    Z,
    T,
}

/// Ellipsoidal geographic coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeogCs {
    pub semi_major_axis: f64,
    pub semi_minor_axis: f64,
}

/// A named set of coordinate points.
#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    pub var_name: Option<String>,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub units: Units,
    pub points: Points,
    pub axis: Option<Axis>,
    pub coord_system: Option<GeogCs>,
}

impl Coord {
    /// Numeric coordinate identified by its variable name.
    pub fn numeric(var_name: &str, units: Units, points: Vec<f64>) -> Self {
        Self {
            var_name: Some(var_name.to_string()),
            standard_name: None,
            long_name: None,
            units,
            points: Points::Numeric(points),
            axis: None,
            coord_system: None,
        }
    }

    /// Scalar label coordinate, such as `Model = CMCC-CM`.
    pub fn label(long_name: &str, value: &str) -> Self {
        Self {
            var_name: None,
            standard_name: None,
            long_name: Some(long_name.to_string()),
            units: Units::NoUnit,
            points: Points::Labels(vec![value.to_string()]),
            axis: None,
            coord_system: None,
        }
    }

    /// Categorisation coordinate with one integer per point of another coordinate.
    pub fn category(var_name: &str, values: Vec<i64>) -> Self {
        Self::numeric(
            var_name,
            Units::Other("1".to_string()),
            values.into_iter().map(|v| v as f64).collect(),
        )
    }

    /// Categorisation coordinate with one label per point of another coordinate.
    pub fn category_labels(var_name: &str, values: Vec<String>) -> Self {
        Self {
            var_name: Some(var_name.to_string()),
            standard_name: None,
            long_name: None,
            units: Units::NoUnit,
            points: Points::Labels(values),
            axis: None,
            coord_system: None,
        }
    }

    pub fn with_standard_name(mut self, name: &str) -> Self {
        self.standard_name = Some(name.to_string());
        self
    }

    pub fn with_long_name(mut self, name: &str) -> Self {
        self.long_name = Some(name.to_string());
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn with_coord_system(mut self, cs: GeogCs) -> Self {
        self.coord_system = Some(cs);
        self
    }

    /// Best available name: standard name, then long name, then variable name.
    pub fn name(&self) -> &str {
        self.standard_name
            .as_deref()
            .or(self.long_name.as_deref())
            .or(self.var_name.as_deref())
            .unwrap_or("unknown")
    }

    /// Whether any of the coordinate's names equals `name`.
    pub fn matches_name(&self, name: &str) -> bool {
        [&self.standard_name, &self.long_name, &self.var_name]
            .iter()
            .any(|n| n.as_deref() == Some(name))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_time(&self) -> bool {
        self.units.is_time_reference()
    }

    /// Whether this coordinate describes latitude.
    pub fn is_latitude(&self) -> bool {
        self.axis == Some(Axis::Y)
            || self.matches_name("latitude")
            || self.matches_name("lat")
    }

    /// Whether this coordinate describes longitude.
    pub fn is_longitude(&self) -> bool {
        self.axis == Some(Axis::X)
            || self.matches_name("longitude")
            || self.matches_name("lon")
    }

    /// Calendar dates of a time coordinate.
    pub fn dates(&self) -> NetCdfResult<Vec<CalendarDate>> {
        let units = self.units.time().ok_or_else(|| {
            NetCdfError::InvalidTimeUnits(format!("{} is not a time coordinate", self.name()))
        })?;
        let points = self.points.as_numeric().ok_or_else(|| {
            NetCdfError::InvalidFormat(format!("{} has non-numeric points", self.name()))
        })?;
        points
            .iter()
            .map(|&p| units.num2date(p).map_err(NetCdfError::from))
            .collect()
    }

    fn select(&self, indices: &[usize]) -> Coord {
        Coord {
            points: self.points.select(indices),
            ..self.clone()
        }
    }
}

/// A coordinate describing one data dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimCoord {
    pub coord: Coord,
    pub dim: usize,
}

/// A coordinate bound to one dimension, or scalar when `dim` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxCoord {
    pub coord: Coord,
    pub dim: Option<usize>,
}

/// One variable's gridded data with its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    pub var_name: String,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub units: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
    pub dim_coords: Vec<DimCoord>,
    pub aux_coords: Vec<AuxCoord>,
    pub attributes: BTreeMap<String, String>,
}

impl Cube {
    /// Create a cube without coordinates. `data` must match `shape`.
    pub fn new(var_name: &str, units: &str, shape: Vec<usize>, data: Vec<f32>) -> NetCdfResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "{}: shape {:?} needs {} values, got {}",
                var_name,
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            var_name: var_name.to_string(),
            standard_name: None,
            long_name: None,
            units: units.to_string(),
            shape,
            data,
            dim_coords: Vec::new(),
            aux_coords: Vec::new(),
            attributes: BTreeMap::new(),
        })
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Attach a dimension coordinate, replacing any existing one on `dim`.
    pub fn add_dim_coord(&mut self, coord: Coord, dim: usize) -> NetCdfResult<()> {
        self.check_extent(&coord, dim)?;
        self.dim_coords.retain(|c| c.dim != dim);
        self.dim_coords.push(DimCoord { coord, dim });
        self.dim_coords.sort_by_key(|c| c.dim);
        Ok(())
    }

    /// Attach an auxiliary coordinate, scalar when `dim` is `None`.
    pub fn add_aux_coord(&mut self, coord: Coord, dim: Option<usize>) -> NetCdfResult<()> {
        match dim {
            Some(d) => self.check_extent(&coord, d)?,
            None if coord.len() != 1 => {
                return Err(NetCdfError::InvalidFormat(format!(
                    "scalar coordinate {} has {} points",
                    coord.name(),
                    coord.len()
                )))
            }
            None => {}
        }
        self.aux_coords.push(AuxCoord { coord, dim });
        Ok(())
    }

    fn check_extent(&self, coord: &Coord, dim: usize) -> NetCdfResult<()> {
        match self.shape.get(dim) {
            Some(&n) if n == coord.len() => Ok(()),
            Some(&n) => Err(NetCdfError::InvalidFormat(format!(
                "coordinate {} has {} points but dimension {} has length {}",
                coord.name(),
                coord.len(),
                dim,
                n
            ))),
            None => Err(NetCdfError::InvalidFormat(format!(
                "dimension {} out of range for {}-d cube",
                dim,
                self.ndim()
            ))),
        }
    }

    /// Look up a coordinate by any of its names, dimension coordinates first.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.dim_coords
            .iter()
            .map(|c| &c.coord)
            .chain(self.aux_coords.iter().map(|c| &c.coord))
            .find(|c| c.matches_name(name))
    }

    /// Dimension a named coordinate spans, `None` for scalar or missing ones.
    pub fn coord_dim(&self, name: &str) -> Option<usize> {
        if let Some(c) = self.dim_coords.iter().find(|c| c.coord.matches_name(name)) {
            return Some(c.dim);
        }
        self.aux_coords
            .iter()
            .find(|c| c.coord.matches_name(name))
            .and_then(|c| c.dim)
    }

    pub fn dim_coord(&self, dim: usize) -> Option<&Coord> {
        self.dim_coords.iter().find(|c| c.dim == dim).map(|c| &c.coord)
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.coord(name).is_some()
    }

    /// All coordinates with time reference units, with the dimension they span.
    pub fn time_coords(&self) -> Vec<(&Coord, Option<usize>)> {
        self.dim_coords
            .iter()
            .map(|c| (&c.coord, Some(c.dim)))
            .chain(self.aux_coords.iter().map(|c| (&c.coord, c.dim)))
            .filter(|(c, _)| c.is_time())
            .collect()
    }

    /// The time coordinate (axis T), preferring dimension coordinates.
    pub fn time_coord(&self) -> Option<(&Coord, Option<usize>)> {
        self.time_coords().into_iter().next()
    }

    /// Mutable access to every time coordinate.
    pub fn time_coords_mut(&mut self) -> impl Iterator<Item = &mut Coord> {
        self.dim_coords
            .iter_mut()
            .map(|c| &mut c.coord)
            .chain(self.aux_coords.iter_mut().map(|c| &mut c.coord))
            .filter(|c| c.is_time())
    }

    /// Value of a scalar label coordinate such as `Model`.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.aux_coords
            .iter()
            .filter(|c| c.dim.is_none())
            .find(|c| c.coord.matches_name(name))
            .and_then(|c| c.coord.points.as_labels())
            .and_then(|labels| labels.first())
            .map(|s| s.as_str())
    }

    pub fn remove_coord(&mut self, name: &str) -> bool {
        let before = self.dim_coords.len() + self.aux_coords.len();
        self.dim_coords.retain(|c| !c.coord.matches_name(name));
        self.aux_coords.retain(|c| !c.coord.matches_name(name));
        before != self.dim_coords.len() + self.aux_coords.len()
    }

    /// Move an auxiliary coordinate onto the dimension it spans.
    ///
    /// The dimension must not already have a dimension coordinate.
    pub fn promote_aux_coord(&mut self, name: &str) -> NetCdfResult<()> {
        let pos = self
            .aux_coords
            .iter()
            .position(|c| c.coord.matches_name(name))
            .ok_or_else(|| NetCdfError::MissingData(format!("auxiliary coordinate {}", name)))?;
        let dim = self.aux_coords[pos].dim.ok_or_else(|| {
            NetCdfError::InvalidFormat(format!("cannot promote scalar coordinate {}", name))
        })?;
        if self.dim_coord(dim).is_some() {
            return Err(NetCdfError::InvalidFormat(format!(
                "dimension {} already has a dimension coordinate",
                dim
            )));
        }
        let aux = self.aux_coords.remove(pos);
        self.dim_coords.push(DimCoord {
            coord: aux.coord,
            dim,
        });
        self.dim_coords.sort_by_key(|c| c.dim);
        Ok(())
    }

    /// Sub-cube keeping only `indices` along `dim`.
    pub fn select(&self, dim: usize, indices: &[usize]) -> NetCdfResult<Cube> {
        let len = *self.shape.get(dim).ok_or_else(|| {
            NetCdfError::InvalidFormat(format!("dimension {} out of range", dim))
        })?;
        if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
            return Err(NetCdfError::InvalidFormat(format!(
                "index {} out of range for dimension {} of length {}",
                bad, dim, len
            )));
        }

        let outer: usize = self.shape[..dim].iter().product();
        let inner: usize = self.shape[dim + 1..].iter().product();
        let mut data = Vec::with_capacity(outer * indices.len() * inner);
        for o in 0..outer {
            for &i in indices {
                let start = (o * len + i) * inner;
                data.extend_from_slice(&self.data[start..start + inner]);
            }
        }

        let mut shape = self.shape.clone();
        shape[dim] = indices.len();

        Ok(Cube {
            shape,
            data,
            dim_coords: self
                .dim_coords
                .iter()
                .map(|c| DimCoord {
                    coord: if c.dim == dim {
                        c.coord.select(indices)
                    } else {
                        c.coord.clone()
                    },
                    dim: c.dim,
                })
                .collect(),
            aux_coords: self
                .aux_coords
                .iter()
                .map(|c| AuxCoord {
                    coord: if c.dim == Some(dim) {
                        c.coord.select(indices)
                    } else {
                        c.coord.clone()
                    },
                    dim: c.dim,
                })
                .collect(),
            ..self.clone()
        })
    }

    /// Take a single index along `dim` and drop that dimension.
    ///
    /// Coordinates on `dim` become scalar auxiliary coordinates.
    pub fn collapse_dim(&self, dim: usize, index: usize) -> NetCdfResult<Cube> {
        let mut cube = self.select(dim, &[index])?;
        cube.shape.remove(dim);

        let shift = |d: usize| if d > dim { d - 1 } else { d };

        let mut dim_coords = Vec::new();
        let mut aux_coords = Vec::new();
        for c in cube.dim_coords.drain(..) {
            if c.dim == dim {
                aux_coords.push(AuxCoord {
                    coord: c.coord,
                    dim: None,
                });
            } else {
                dim_coords.push(DimCoord {
                    coord: c.coord,
                    dim: shift(c.dim),
                });
            }
        }
        for c in cube.aux_coords.drain(..) {
            let dim = match c.dim {
                Some(d) if d == dim => None,
                Some(d) => Some(shift(d)),
                None => None,
            };
            aux_coords.push(AuxCoord { coord: c.coord, dim });
        }
        cube.dim_coords = dim_coords;
        cube.aux_coords = aux_coords;
        Ok(cube)
    }

    /// One-line description used by the CLI and in log output.
    pub fn summary(&self) -> CubeSummary {
        let time_range = self
            .time_coord()
            .and_then(|(c, _)| c.dates().ok())
            .and_then(|dates| Some((dates.first()?.to_string(), dates.last()?.to_string())));
        let labels = self
            .aux_coords
            .iter()
            .filter(|c| c.dim.is_none())
            .filter_map(|c| {
                let value = match &c.coord.points {
                    Points::Labels(l) => l.first()?.clone(),
                    Points::Numeric(n) => n.first()?.to_string(),
                };
                Some((c.coord.name().to_string(), value))
            })
            .collect();

        CubeSummary {
            var_name: self.var_name.clone(),
            units: self.units.clone(),
            shape: self.shape.clone(),
            dims: (0..self.ndim())
                .map(|d| {
                    self.dim_coord(d)
                        .map(|c| c.name().to_string())
                        .unwrap_or_else(|| format!("-- ({})", d))
                })
                .collect(),
            time_range,
            labels,
        }
    }
}

/// Serializable overview of a cube.
#[derive(Debug, Clone, Serialize)]
pub struct CubeSummary {
    pub var_name: String,
    pub units: String,
    pub shape: Vec<usize>,
    pub dims: Vec<String>,
    pub time_range: Option<(String, String)>,
    pub labels: BTreeMap<String, String>,
}

impl fmt::Display for CubeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / ({}) {:?} [{}]", self.var_name, self.units, self.shape, self.dims.join(", "))?;
        if let Some((start, end)) = &self.time_range {
            write!(f, " {} .. {}", start, end)?;
        }
        for (name, value) in &self.labels {
            write!(f, " {}={}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmip_common::{Calendar, TimeUnits};

    fn time_units() -> Units {
        Units::Time(TimeUnits::parse("days since 2000-01-01", Calendar::Standard).unwrap())
    }

    fn cube_3d() -> Cube {
        // (time=2, lat=2, lon=3)
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let mut cube = Cube::new("tas", "K", vec![2, 2, 3], data).unwrap();
        cube.add_dim_coord(Coord::numeric("time", time_units(), vec![15.5, 45.0]), 0)
            .unwrap();
        cube.add_dim_coord(
            Coord::numeric("lat", Units::Other("degrees_north".into()), vec![-45.0, 45.0])
                .with_standard_name("latitude"),
            1,
        )
        .unwrap();
        cube.add_dim_coord(
            Coord::numeric("lon", Units::Other("degrees_east".into()), vec![0.0, 120.0, 240.0])
                .with_standard_name("longitude"),
            2,
        )
        .unwrap();
        cube
    }

    #[test]
    fn test_new_rejects_mismatched_shape() {
        assert!(Cube::new("tas", "K", vec![2, 2], vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_units_parse() {
        assert!(Units::parse("days since 1850-01-01", Some("noleap")).is_time_reference());
        assert_eq!(Units::parse("K", None), Units::Other("K".to_string()));
        assert_eq!(Units::parse("no_unit", None), Units::NoUnit);
        match Units::parse("days since 1850-01-01", Some("gregorian")) {
            Units::Time(t) => assert_eq!(t.calendar, Calendar::Gregorian),
            other => panic!("expected time units, got {:?}", other),
        }
    }

    #[test]
    fn test_select_middle_dimension() {
        let cube = cube_3d();
        let sub = cube.select(1, &[1]).unwrap();
        assert_eq!(sub.shape, vec![2, 1, 3]);
        assert_eq!(sub.data, vec![3.0, 4.0, 5.0, 9.0, 10.0, 11.0]);
        assert_eq!(
            sub.coord("latitude").unwrap().points,
            Points::Numeric(vec![45.0])
        );
    }

    #[test]
    fn test_collapse_dim_makes_scalar_coord() {
        let cube = cube_3d();
        let point = cube.collapse_dim(2, 1).unwrap();
        assert_eq!(point.shape, vec![2, 2]);
        assert_eq!(point.data, vec![1.0, 4.0, 7.0, 10.0]);
        assert_eq!(point.coord_dim("longitude"), None);
        assert!(point.has_coord("longitude"));
        assert_eq!(point.coord_dim("latitude"), Some(1));
    }

    #[test]
    fn test_promote_aux_time() {
        let mut cube = Cube::new("tas", "K", vec![2], vec![1.0, 2.0]).unwrap();
        cube.add_aux_coord(Coord::numeric("time", time_units(), vec![0.0, 31.0]), Some(0))
            .unwrap();
        assert!(cube.dim_coord(0).is_none());
        cube.promote_aux_coord("time").unwrap();
        assert_eq!(cube.dim_coord(0).unwrap().name(), "time");
        assert!(cube.aux_coords.is_empty());
    }

    #[test]
    fn test_label_lookup() {
        let mut cube = cube_3d();
        cube.add_aux_coord(Coord::label("Model", "CMCC-CM"), None).unwrap();
        assert_eq!(cube.label("Model"), Some("CMCC-CM"));
        assert_eq!(cube.label("Experiment"), None);
    }

    #[test]
    fn test_summary_contains_time_range() {
        let summary = cube_3d().summary();
        let (start, end) = summary.time_range.clone().unwrap();
        assert!(start.starts_with("2000-01-16"));
        assert!(end.starts_with("2000-02-15"));
        assert_eq!(summary.dims, vec!["time", "latitude", "longitude"]);
    }
}
