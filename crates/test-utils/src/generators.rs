//! Synthetic cubes with predictable values.
//!
//! Data values encode their position so tests can check that slicing,
//! sampling and joining move the right numbers around.

use cmip_common::{Calendar, CalendarDate, TimeUnits};
use netcdf_parser::{Axis, Coord, Cube, Units};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Mid-month time values (the 15th) for `months` consecutive months.
pub fn monthly_time_points(units: &TimeUnits, year: i32, month: u32, months: usize) -> Vec<f64> {
    (0..months)
        .map(|i| {
            let m0 = (month - 1) as usize + i;
            let date = CalendarDate::new(year + (m0 / 12) as i32, (m0 % 12) as u32 + 1, 15);
            units
                .date2num(&date)
                .expect("Failed to encode test date")
        })
        .collect()
}

pub fn latitude(points: Vec<f64>) -> Coord {
    Coord::numeric("lat", Units::Other("degrees_north".to_string()), points)
        .with_standard_name("latitude")
        .with_axis(Axis::Y)
}

pub fn longitude(points: Vec<f64>) -> Coord {
    Coord::numeric("lon", Units::Other("degrees_east".to_string()), points)
        .with_standard_name("longitude")
        .with_axis(Axis::X)
}

/// Describes a synthetic monthly `(time, lat, lon)` cube.
#[derive(Debug, Clone)]
pub struct MonthlyCube {
    pub var_name: String,
    pub units: String,
    pub time_units: String,
    pub calendar: Calendar,
    pub year: i32,
    pub month: u32,
    pub months: usize,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl MonthlyCube {
    /// A 2x3 global grid starting January of `year`, in `days since 1850-01-01`.
    pub fn new(var_name: &str, year: i32, months: usize) -> Self {
        Self {
            var_name: var_name.to_string(),
            units: "K".to_string(),
            time_units: "days since 1850-01-01".to_string(),
            calendar: Calendar::Standard,
            year,
            month: 1,
            months,
            lats: vec![-45.0, 45.0],
            lons: vec![0.0, 120.0, 240.0],
        }
    }

    pub fn calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn time_units(mut self, units: &str) -> Self {
        self.time_units = units.to_string();
        self
    }

    pub fn start_month(mut self, month: u32) -> Self {
        self.month = month;
        self
    }

    pub fn lats(mut self, lats: Vec<f64>) -> Self {
        self.lats = lats;
        self
    }

    /// Build the cube. Values are `month_index * 100 + lat_index * 10 + lon_index`.
    pub fn build(&self) -> Cube {
        let units = TimeUnits::parse(&self.time_units, self.calendar).expect("Invalid time units");
        let times = monthly_time_points(&units, self.year, self.month, self.months);
        let (nt, ny, nx) = (self.months, self.lats.len(), self.lons.len());

        let mut data = Vec::with_capacity(nt * ny * nx);
        for t in 0..nt {
            for y in 0..ny {
                for x in 0..nx {
                    data.push((t * 100 + y * 10 + x) as f32);
                }
            }
        }

        let mut cube = Cube::new(&self.var_name, &self.units, vec![nt, ny, nx], data)
            .expect("Invalid test cube shape");
        cube.add_dim_coord(
            Coord::numeric("time", Units::Time(units), times)
                .with_standard_name("time")
                .with_axis(Axis::T),
            0,
        )
        .expect("Invalid time coordinate");
        cube.add_dim_coord(latitude(self.lats.clone()), 1)
            .expect("Invalid latitude coordinate");
        cube.add_dim_coord(longitude(self.lons.clone()), 2)
            .expect("Invalid longitude coordinate");
        cube
    }
}

/// A `(lat, lon)` field such as orography, with no time axis.
pub fn fixed_field_cube(var_name: &str, units: &str) -> Cube {
    let lats = vec![-45.0, 45.0];
    let lons = vec![0.0, 120.0, 240.0];
    let data = create_test_grid(lons.len(), lats.len());
    let mut cube = Cube::new(var_name, units, vec![lats.len(), lons.len()], data)
        .expect("Invalid test cube shape");
    cube.add_dim_coord(latitude(lats), 0)
        .expect("Invalid latitude coordinate");
    cube.add_dim_coord(longitude(lons), 1)
        .expect("Invalid longitude coordinate");
    cube
}
