//! Subcommand implementations.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use catalogue::{Catalogue, FilterSpec};
use grid_processor::LatLon;
use netcdf_parser::{Constraint, Cube, CubeLoader, CubeSummary};
use retrieval::{Archive, CatalogueOptions};

/// Parse repeated `--filter Column=value[,value...]` arguments.
pub fn parse_filters(filters: &[String]) -> Result<FilterSpec> {
    filters
        .iter()
        .try_fold(FilterSpec::new(), |spec, arg| spec.parse_arg(arg))
        .context("Invalid --filter")
}

/// Constraint for optional `--year` and `--month` selections.
pub fn time_constraint(year: Option<i32>, month: Option<i32>) -> Option<Constraint> {
    let year = year.map(|y| Constraint::coord_eq("year", y));
    let month = month.map(|m| Constraint::coord_eq("month", m));
    match (year, month) {
        (Some(y), Some(m)) => Some(y.and(m)),
        (y, m) => y.or(m),
    }
}

pub fn build<L: CubeLoader>(archive: &Archive<L>) -> Result<()> {
    let table = archive.refresh()?;
    info!(
        rows = table.len(),
        path = %archive.config().local_file.display(),
        "Catalogue rebuilt"
    );
    println!("{} rows written to {}", table.len(), archive.config().local_file.display());
    Ok(())
}

pub fn query<L: CubeLoader>(
    archive: &Archive<L>,
    spec: &FilterSpec,
    options: CatalogueOptions,
    json: bool,
) -> Result<()> {
    let rows = archive.catalogue(spec, options)?;
    write_rows(&rows, json, io::stdout().lock())
}

fn write_rows<W: Write>(rows: &Catalogue, json: bool, mut out: W) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut out, rows)?;
        writeln!(out)?;
    } else {
        rows.to_writer(out)?;
    }
    Ok(())
}

pub fn load<L: CubeLoader>(
    archive: &Archive<L>,
    spec: &FilterSpec,
    options: CatalogueOptions,
    constraint: Option<&Constraint>,
    target: Option<LatLon>,
    json: bool,
) -> Result<()> {
    let rows = archive.catalogue(spec, options)?;
    let cubes = archive.get_cubes(&rows, constraint, target)?;
    print_summaries(&cubes, json)
}

pub fn template<L: CubeLoader>(archive: &Archive<L>, json: bool) -> Result<()> {
    let cube = archive.template_cube()?;
    print_summaries(std::slice::from_ref(&cube), json)
}

pub fn fixed_field<L: CubeLoader>(archive: &Archive<L>, model: &str, var: &str, json: bool) -> Result<()> {
    let cube = archive.get_fx(model, var)?;
    print_summaries(std::slice::from_ref(&cube), json)
}

fn print_summaries(cubes: &[Cube], json: bool) -> Result<()> {
    let summaries: Vec<CubeSummary> = cubes.iter().map(Cube::summary).collect();
    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &summaries)?;
        writeln!(out)?;
    } else {
        for summary in &summaries {
            writeln!(out, "{}", summary)?;
        }
    }
    Ok(())
}
