//! Derived time categorisations (year, month, season).
//!
//! Each categorisation is an auxiliary coordinate on the same dimension as
//! the time coordinate it is derived from, with one value per timestep.

use cmip_common::{month_number, season_of_month, season_year, CalendarDate};

use crate::cube::{Coord, Cube};
use crate::error::{NetCdfError, NetCdfResult};

fn time_dates(cube: &Cube, time_name: &str) -> NetCdfResult<(Vec<CalendarDate>, Option<usize>)> {
    let coord = cube
        .coord(time_name)
        .ok_or_else(|| NetCdfError::MissingData(format!("coordinate {}", time_name)))?;
    Ok((coord.dates()?, cube.coord_dim(time_name)))
}

fn add_category<F>(cube: &mut Cube, time_name: &str, build: F) -> NetCdfResult<()>
where
    F: Fn(&[CalendarDate]) -> Coord,
{
    let (dates, dim) = time_dates(cube, time_name)?;
    let coord = build(&dates);
    cube.remove_coord(coord.name());
    cube.add_aux_coord(coord, dim)
}

/// Add a `name` coordinate holding the calendar year of each timestep.
pub fn add_year(cube: &mut Cube, time_name: &str, name: &str) -> NetCdfResult<()> {
    add_category(cube, time_name, |dates| {
        Coord::category(name, dates.iter().map(|d| d.year as i64).collect())
    })
}

/// Add a `name` coordinate holding the month number (1-12) of each timestep.
pub fn add_month_number(cube: &mut Cube, time_name: &str, name: &str) -> NetCdfResult<()> {
    add_category(cube, time_name, |dates| {
        Coord::category(name, dates.iter().map(month_number).collect())
    })
}

/// Add a `name` coordinate holding the season label (djf/mam/jja/son).
pub fn add_season(cube: &mut Cube, time_name: &str, name: &str) -> NetCdfResult<()> {
    add_category(cube, time_name, |dates| {
        Coord::category_labels(
            name,
            dates
                .iter()
                .map(|d| season_of_month(d.month).to_string())
                .collect(),
        )
    })
}

/// Add a `name` coordinate holding the year each timestep's season belongs to.
pub fn add_season_year(cube: &mut Cube, time_name: &str, name: &str) -> NetCdfResult<()> {
    add_category(cube, time_name, |dates| {
        Coord::category(name, dates.iter().map(season_year).collect())
    })
}

/// Add `year`, `month`, `clim_season` and `season_year` if the cube has time.
///
/// Returns whether a time coordinate was found.
pub fn add_time_categorisations(cube: &mut Cube) -> NetCdfResult<bool> {
    let time_name = match cube.time_coord() {
        Some((coord, _)) => coord
            .var_name
            .clone()
            .unwrap_or_else(|| coord.name().to_string()),
        None => return Ok(false),
    };

    add_year(cube, &time_name, "year")?;
    add_month_number(cube, &time_name, "month")?;
    add_season(cube, &time_name, "clim_season")?;
    add_season_year(cube, &time_name, "season_year")?;
    Ok(true)
}
