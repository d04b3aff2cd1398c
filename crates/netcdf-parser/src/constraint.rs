//! Load constraints for selecting cubes and sub-cubes.

use crate::cube::{Cube, Points};
use crate::error::NetCdfResult;

/// Value a coordinate constraint compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintValue {
    Number(f64),
    Label(String),
}

impl From<f64> for ConstraintValue {
    fn from(v: f64) -> Self {
        ConstraintValue::Number(v)
    }
}

impl From<i64> for ConstraintValue {
    fn from(v: i64) -> Self {
        ConstraintValue::Number(v as f64)
    }
}

impl From<i32> for ConstraintValue {
    fn from(v: i32) -> Self {
        ConstraintValue::Number(v as f64)
    }
}

impl From<&str> for ConstraintValue {
    fn from(v: &str) -> Self {
        ConstraintValue::Label(v.to_string())
    }
}

/// Selects whole cubes (by variable name) or points along a coordinate.
///
/// A cube that ends up with no points along a constrained coordinate, or that
/// lacks the constrained coordinate altogether, does not match.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Match cubes whose `var_name` equals the given name
    VarName(String),
    /// Keep points where the named coordinate equals the value
    CoordEquals { name: String, value: ConstraintValue },
    /// Keep points where the named numeric coordinate lies in `[min, max]`
    CoordRange { name: String, min: f64, max: f64 },
    /// All constraints must hold, applied in order
    And(Vec<Constraint>),
}

impl Constraint {
    pub fn var_name(name: &str) -> Self {
        Constraint::VarName(name.to_string())
    }

    pub fn coord_eq(name: &str, value: impl Into<ConstraintValue>) -> Self {
        Constraint::CoordEquals {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn coord_range(name: &str, min: f64, max: f64) -> Self {
        Constraint::CoordRange {
            name: name.to_string(),
            min,
            max,
        }
    }

    /// Combine with another constraint; both must hold.
    pub fn and(self, other: Constraint) -> Constraint {
        match (self, other) {
            (Constraint::And(mut a), Constraint::And(b)) => {
                a.extend(b);
                Constraint::And(a)
            }
            (Constraint::And(mut a), other) => {
                a.push(other);
                Constraint::And(a)
            }
            (this, other) => Constraint::And(vec![this, other]),
        }
    }

    /// Apply to a cube, returning the (possibly subset) cube if it matches.
    pub fn extract(&self, cube: Cube) -> NetCdfResult<Option<Cube>> {
        match self {
            Constraint::VarName(name) => Ok((cube.var_name == *name).then_some(cube)),
            Constraint::CoordEquals { name, value } => {
                extract_points(cube, name, |points, i| match (points, value) {
                    (Points::Numeric(p), ConstraintValue::Number(v)) => p[i] == *v,
                    (Points::Labels(p), ConstraintValue::Label(v)) => p[i] == *v,
                    _ => false,
                })
            }
            Constraint::CoordRange { name, min, max } => {
                extract_points(cube, name, |points, i| match points {
                    Points::Numeric(p) => p[i] >= *min && p[i] <= *max,
                    Points::Labels(_) => false,
                })
            }
            Constraint::And(parts) => {
                let mut current = Some(cube);
                for part in parts {
                    current = match current {
                        Some(c) => part.extract(c)?,
                        None => return Ok(None),
                    };
                }
                Ok(current)
            }
        }
    }
}

fn extract_points<F>(cube: Cube, name: &str, keep: F) -> NetCdfResult<Option<Cube>>
where
    F: Fn(&Points, usize) -> bool,
{
    let coord = match cube.coord(name) {
        Some(c) => c,
        None => return Ok(None),
    };
    let indices: Vec<usize> = (0..coord.len()).filter(|&i| keep(&coord.points, i)).collect();

    match cube.coord_dim(name) {
        None => Ok((!indices.is_empty()).then_some(cube)),
        Some(_) if indices.is_empty() => Ok(None),
        Some(dim) if indices.len() == cube.shape[dim] => Ok(Some(cube)),
        Some(dim) => cube.select(dim, &indices).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{Coord, Units};

    fn monthly_cube() -> Cube {
        let mut cube = Cube::new("tas", "K", vec![4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        cube.add_aux_coord(Coord::category("year", vec![1999, 1999, 2000, 2000]), Some(0))
            .unwrap();
        cube.add_aux_coord(Coord::category("month", vec![11, 12, 1, 2]), Some(0))
            .unwrap();
        cube.add_aux_coord(Coord::label("Model", "CMCC-CM"), None).unwrap();
        cube
    }

    #[test]
    fn test_var_name() {
        assert!(Constraint::var_name("tas").extract(monthly_cube()).unwrap().is_some());
        assert!(Constraint::var_name("pr").extract(monthly_cube()).unwrap().is_none());
    }

    #[test]
    fn test_year_and_month_subset() {
        let con = Constraint::var_name("tas")
            .and(Constraint::coord_eq("year", 2000))
            .and(Constraint::coord_eq("month", 1));
        let cube = con.extract(monthly_cube()).unwrap().unwrap();
        assert_eq!(cube.shape, vec![1]);
        assert_eq!(cube.data, vec![3.0]);
    }

    #[test]
    fn test_no_matching_points() {
        let con = Constraint::coord_eq("year", 1850);
        assert!(con.extract(monthly_cube()).unwrap().is_none());
    }

    #[test]
    fn test_missing_coord_does_not_match() {
        let con = Constraint::coord_eq("pressure", 500.0);
        assert!(con.extract(monthly_cube()).unwrap().is_none());
    }

    #[test]
    fn test_scalar_label() {
        assert!(Constraint::coord_eq("Model", "CMCC-CM")
            .extract(monthly_cube())
            .unwrap()
            .is_some());
        assert!(Constraint::coord_eq("Model", "EC-EARTH")
            .extract(monthly_cube())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_range() {
        let mut cube = Cube::new("ta", "K", vec![3], vec![1.0, 2.0, 3.0]).unwrap();
        cube.add_dim_coord(
            Coord::numeric("plev", Units::Other("Pa".into()), vec![100000.0, 85000.0, 50000.0]),
            0,
        )
        .unwrap();
        let sub = Constraint::coord_range("plev", 80000.0, 100000.0)
            .extract(cube)
            .unwrap()
            .unwrap();
        assert_eq!(sub.data, vec![1.0, 2.0]);
    }
}
