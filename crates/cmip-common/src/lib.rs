//! Common types and utilities shared across the CMIP5 catalogue crates.

pub mod error;
pub mod time;

pub use error::{CmipError, CmipResult};
pub use time::{
    month_number, season_of_month, season_year, Calendar, CalendarDate, TimeStep, TimeUnits,
    SEASONS,
};
