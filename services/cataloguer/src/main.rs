//! CMIP5 catalogue command.
//!
//! Builds the catalogue of a BADC-style CMIP5 archive, queries it, and loads
//! the cubes of matching rows.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

use catalogue::CatalogueConfig;
use cmip_common::CmipError;
use grid_processor::LatLon;
use netcdf_parser::silence_hdf5_errors;
use retrieval::{Archive, CatalogueOptions, LAND_FRACTION, OROGRAPHY};

use config::{load_file_config, resolve, FileConfig, PathOverrides};

#[derive(Parser, Debug)]
#[command(name = "cmip5")]
#[command(about = "Catalogue and load CMIP5 model output")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root of the CMIP5 archive
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Local catalogue file
    #[arg(long, global = true)]
    catalogue: Option<PathBuf>,

    /// Shared catalogue file
    #[arg(long, global = true)]
    shared_catalogue: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the catalogue from the archive
    Build,

    /// Print catalogue rows matching the filters
    Query {
        #[command(flatten)]
        query: QueryArgs,

        /// Print rows as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Load the cubes of matching rows and print their summaries
    Load {
        #[command(flatten)]
        query: QueryArgs,

        /// Keep only timesteps in this year
        #[arg(long)]
        year: Option<i32>,

        /// Keep only timesteps in this month (1-12)
        #[arg(long)]
        month: Option<i32>,

        /// Sample the grid point nearest this latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Sample the grid point nearest this longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarise the orography of a model
    Orog {
        model: String,

        #[arg(long)]
        json: bool,
    },

    /// Summarise the land area fraction of a model
    Laf {
        model: String,

        #[arg(long)]
        json: bool,
    },

    /// Summarise the reference grid cube
    Template {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Column filter such as Model=CMCC-CM or Var=tas,pr (repeatable)
    #[arg(short, long = "filter")]
    filters: Vec<String>,

    /// Keep only runs offering every requested variable
    #[arg(long)]
    complete_var_set: bool,

    /// Rebuild the catalogue before querying
    #[arg(long)]
    refresh: bool,
}

impl QueryArgs {
    fn options(&self) -> CatalogueOptions {
        CatalogueOptions {
            refresh: self.refresh,
            complete_var_set: self.complete_var_set,
        }
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| file_config.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let json_logs = cli.json_logs || file_config.logging.format.as_deref() == Some("json");
    init_tracing(&level, json_logs)?;

    let overrides = PathOverrides {
        root_dir: cli.root.clone(),
        local_file: cli.catalogue.clone(),
        shared_file: cli.shared_catalogue.clone(),
    };
    let config = resolve(&overrides, &file_config, CatalogueConfig::from_env());
    debug!(
        root = %config.root_dir.display(),
        local = %config.local_file.display(),
        shared = %config.shared_file.display(),
        "Resolved catalogue configuration"
    );

    silence_hdf5_errors();
    let archive = Archive::open(config);

    let result = run(&archive, cli.command);
    if let Err(e) = &result {
        error!(error = %e, error.kind = error_kind(e), "Command failed");
    }
    result
}

/// Kind of a library error behind `e`, for log fields.
fn error_kind(e: &anyhow::Error) -> &'static str {
    e.downcast_ref::<CmipError>().map_or("Other", CmipError::kind)
}

fn run(archive: &Archive, command: Command) -> Result<()> {
    match command {
        Command::Build => commands::build(archive),
        Command::Query { query, json } => {
            let spec = commands::parse_filters(&query.filters)?;
            commands::query(archive, &spec, query.options(), json)
        }
        Command::Load {
            query,
            year,
            month,
            lat,
            lon,
            json,
        } => {
            let spec = commands::parse_filters(&query.filters)?;
            let constraint = commands::time_constraint(year, month);
            let target = lat.zip(lon).map(|(lat, lon)| LatLon::new(lat, lon));
            commands::load(archive, &spec, query.options(), constraint.as_ref(), target, json)
        }
        Command::Orog { model, json } => commands::fixed_field(archive, &model, OROGRAPHY, json),
        Command::Laf { model, json } => commands::fixed_field(archive, &model, LAND_FRACTION, json),
        Command::Template { json } => commands::template(archive, json),
    }
}
